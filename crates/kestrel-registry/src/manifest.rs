//! Tool unit manifest types.
//!
//! A tool unit is a TOML document holding an ordered list of `[[tool]]`
//! tables. Each table declares one tool: its name, description text, ordered
//! parameters, and how it runs.
//!
//! ```toml
//! [[tool]]
//! name = "add"
//! doc = """
//! Add two numbers
//! :param a: first
//! :param b: second
//! """
//! returns = "int"
//!
//! [[tool.param]]
//! name = "a"
//! type = "int"
//!
//! [[tool.param]]
//! name = "b"
//! type = "int"
//! default = 0
//!
//! [tool.run]
//! command = "python3"
//! args = ["add.py"]
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use kestrel_contracts::schema::{DeclaredParam, Signature};

/// Longest tool name a completion service accepts.
pub const MAX_TOOL_NAME_LEN: usize = 64;

/// The parsed contents of one tool unit file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitManifest {
    #[serde(default, rename = "tool")]
    pub tools: Vec<ToolEntry>,
}

/// One `[[tool]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolEntry {
    pub name: String,

    /// Free-form description text with optional `:param` annotations.
    #[serde(default)]
    pub doc: Option<String>,

    /// Declared return type. Informational only; never part of the schema.
    #[serde(default)]
    pub returns: Option<String>,

    #[serde(default, rename = "param")]
    pub params: Vec<ParamEntry>,

    pub run: RunSpec,
}

/// One `[[tool.param]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamEntry {
    pub name: String,

    /// Declared type name, e.g. `"int"` or `"list"`.
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,

    /// Presence makes the parameter optional.
    #[serde(default)]
    pub default: Option<Value>,
}

/// The `[tool.run]` table. Exactly one of `builtin` and `command` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSpec {
    /// Name of a native body in the built-in catalog.
    #[serde(default)]
    pub builtin: Option<String>,

    /// Program to spawn. Paths containing a separator are resolved against
    /// the unit's directory; bare names are looked up on `PATH`.
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    /// Route every call through the Confirmation Gate before spawning.
    #[serde(default)]
    pub confirm: bool,
}

/// How a tool entry is bound to a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTarget<'a> {
    Builtin(&'a str),
    Command {
        program: &'a str,
        args: &'a [String],
        confirm: bool,
    },
}

impl UnitManifest {
    /// Parse a manifest document. The error string is the TOML parser's message.
    pub fn from_toml_str(s: &str) -> Result<Self, String> {
        toml::from_str(s).map_err(|e| e.to_string())
    }
}

impl ToolEntry {
    /// Check the entry for problems that make its unit unloadable.
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_tool_name(&self.name) {
            return Err(format!(
                "invalid tool name '{}': use 1-{MAX_TOOL_NAME_LEN} characters from [A-Za-z0-9_-]",
                self.name
            ));
        }

        let mut seen = HashSet::new();
        for param in &self.params {
            if param.name.trim().is_empty() {
                return Err(format!("tool '{}' declares a parameter with an empty name", self.name));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(format!(
                    "tool '{}' declares parameter '{}' more than once",
                    self.name, param.name
                ));
            }
        }

        self.run_target().map(|_| ())
    }

    /// Resolve the `[tool.run]` table into a single target.
    pub fn run_target(&self) -> Result<RunTarget<'_>, String> {
        match (&self.run.builtin, &self.run.command) {
            (Some(builtin), None) => Ok(RunTarget::Builtin(builtin)),
            (None, Some(program)) if !program.trim().is_empty() => Ok(RunTarget::Command {
                program,
                args: &self.run.args,
                confirm: self.run.confirm,
            }),
            (None, Some(_)) => Err(format!("tool '{}' has an empty run.command", self.name)),
            (Some(_), Some(_)) => Err(format!(
                "tool '{}' sets both run.builtin and run.command",
                self.name
            )),
            (None, None) => Err(format!(
                "tool '{}' sets neither run.builtin nor run.command",
                self.name
            )),
        }
    }

    /// The declared interface the schema synthesizer works from.
    pub fn signature(&self) -> Signature {
        Signature {
            name: self.name.clone(),
            params: self
                .params
                .iter()
                .map(|p| DeclaredParam {
                    name: p.name.clone(),
                    declared_type: p.type_name.clone(),
                    default: p.default.clone(),
                })
                .collect(),
            doc: self.doc.clone(),
        }
    }
}

fn is_valid_tool_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_TOOL_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
