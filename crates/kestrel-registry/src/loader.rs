//! The Module Loader: turns one tool unit into bound Tool Descriptors.
//!
//! Every call reads and parses the unit afresh; nothing is cached between
//! loads. Each load gets its own `UnitName`, generated unless the caller
//! supplies one. Any failure is a `KestrelError::UnitLoad` returned to the
//! caller; the loader never recovers internally.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use kestrel_contracts::{
    error::{KestrelError, KestrelResult},
    schema::InvocationSchema,
    unit::UnitName,
};
use kestrel_core::{gate::Approver, traits::Tool};

use crate::{
    bind::ArgumentBinder,
    command::CommandTool,
    manifest::{RunTarget, ToolEntry, UnitManifest},
    schema::synthesize,
};

/// Native tool bodies that manifests can bind with `run.builtin`.
#[derive(Clone, Default)]
pub struct BuiltinCatalog {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl BuiltinCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tool` under `name`. A second registration replaces the first.
    pub fn register(&mut self, name: impl Into<String>, tool: Arc<dyn Tool>) {
        self.tools.insert(name.into(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<S: Into<String>> FromIterator<(S, Arc<dyn Tool>)> for BuiltinCatalog {
    fn from_iter<I: IntoIterator<Item = (S, Arc<dyn Tool>)>>(tools: I) -> Self {
        let mut catalog = Self::new();
        for (name, tool) in tools {
            catalog.register(name, tool);
        }
        catalog
    }
}

/// A registry entry: one named, callable tool and its schema.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub unit: UnitName,
    pub schema: InvocationSchema,
    pub binder: Arc<ArgumentBinder>,
    pub tool: Arc<dyn Tool>,
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("unit", &self.unit)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// One freshly loaded tool unit.
#[derive(Debug, Clone)]
pub struct LoadedUnit {
    pub name: UnitName,
    /// Where the unit came from: a file path, or a label for in-memory units.
    pub origin: String,
    /// Tools in declaration order.
    pub tools: Vec<ToolDescriptor>,
}

/// Loads tool units and binds their tools to bodies.
#[derive(Clone)]
pub struct UnitLoader {
    catalog: BuiltinCatalog,
    approver: Arc<dyn Approver>,
}

impl UnitLoader {
    /// `approver` gates command tools declared with `confirm = true`.
    pub fn new(catalog: BuiltinCatalog, approver: Arc<dyn Approver>) -> Self {
        Self { catalog, approver }
    }

    pub fn catalog(&self) -> &BuiltinCatalog {
        &self.catalog
    }

    /// Read and load the unit at `path`.
    pub fn load_unit(&self, path: &Path, name: Option<&str>) -> KestrelResult<LoadedUnit> {
        let text = std::fs::read_to_string(path).map_err(|e| KestrelError::UnitLoad {
            path: path.display().to_string(),
            reason: format!("cannot read unit: {e}"),
        })?;
        self.load(name, &path.display().to_string(), path.parent(), &text)
    }

    /// Load a unit held in memory. Relative command paths cannot be resolved
    /// for such units and fail the load.
    pub fn load_unit_source(&self, name: Option<&str>, origin: &str, text: &str) -> KestrelResult<LoadedUnit> {
        self.load(name, origin, None, text)
    }

    fn load(&self, name: Option<&str>, origin: &str, dir: Option<&Path>, text: &str) -> KestrelResult<LoadedUnit> {
        let unit_name = name.map(UnitName::new).unwrap_or_else(UnitName::generate);
        let fail = |reason: String| KestrelError::UnitLoad {
            path: origin.to_string(),
            reason,
        };

        let manifest = UnitManifest::from_toml_str(text).map_err(fail)?;

        let mut tools = Vec::with_capacity(manifest.tools.len());
        for entry in &manifest.tools {
            entry.validate().map_err(fail)?;
            tools.push(self.bind(entry, &unit_name, dir).map_err(fail)?);
        }

        info!(unit = %unit_name, origin = %origin, tools = tools.len(), "tool unit loaded");
        Ok(LoadedUnit {
            name: unit_name,
            origin: origin.to_string(),
            tools,
        })
    }

    fn bind(&self, entry: &ToolEntry, unit: &UnitName, dir: Option<&Path>) -> Result<ToolDescriptor, String> {
        let tool: Arc<dyn Tool> = match entry.run_target()? {
            RunTarget::Builtin(builtin) => self.catalog.get(builtin).ok_or_else(|| {
                format!("tool '{}' binds unknown builtin '{}'", entry.name, builtin)
            })?,
            RunTarget::Command { program, args, confirm } => {
                let program = resolve_program(program, dir)
                    .map_err(|reason| format!("tool '{}': {}", entry.name, reason))?;
                Arc::new(CommandTool::new(
                    &entry.name,
                    program,
                    args.to_vec(),
                    dir.map(Path::to_path_buf),
                    confirm,
                    self.approver.clone(),
                ))
            }
        };

        let signature = entry.signature();
        let schema = synthesize(&signature);
        let binder = ArgumentBinder::new(signature, &schema)?;

        debug!(unit = %unit, tool = %entry.name, params = schema.parameters.len(), "tool bound");
        Ok(ToolDescriptor {
            name: entry.name.clone(),
            unit: unit.clone(),
            schema,
            binder: Arc::new(binder),
            tool,
        })
    }
}

/// Bare names go to `PATH` at spawn time. Anything with a separator must
/// exist, relative to the unit directory when not absolute.
fn resolve_program(program: &str, dir: Option<&Path>) -> Result<PathBuf, String> {
    let path = Path::new(program);
    if path.components().count() == 1 && !path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let resolved = match (path.is_absolute(), dir) {
        (true, _) => path.to_path_buf(),
        (false, Some(dir)) => dir.join(path),
        (false, None) => {
            return Err(format!(
                "relative program path '{program}' needs a unit loaded from a file"
            ))
        }
    };

    if resolved.exists() {
        Ok(resolved)
    } else {
        Err(format!("program '{}' does not exist", resolved.display()))
    }
}
