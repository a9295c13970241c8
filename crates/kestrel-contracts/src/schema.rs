//! Tool signatures and the invocation schemas derived from them.
//!
//! A `Signature` is what a tool unit declares: a name, ordered parameters and
//! free-form description text. An `InvocationSchema` is what the completion
//! service is shown. The synthesizer in `kestrel-registry` maps one onto the
//! other; these types only carry data.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The six parameter types a completion service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl SemanticType {
    /// The JSON Schema `type` keyword for this semantic type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::String => "string",
            SemanticType::Integer => "integer",
            SemanticType::Number => "number",
            SemanticType::Boolean => "boolean",
            SemanticType::Object => "object",
            SemanticType::Array => "array",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parameter as declared by a tool unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredParam {
    pub name: String,
    /// The declared type name, verbatim (e.g. "int", "list"). `None` when untyped.
    pub declared_type: Option<String>,
    /// The default value. Its presence is what makes a parameter optional.
    pub default: Option<Value>,
}

impl DeclaredParam {
    pub fn new(name: impl Into<String>, declared_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.map(str::to_string),
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A callable's declared interface: name, parameters in declaration order,
/// and its attached description text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub params: Vec<DeclaredParam>,
    pub doc: Option<String>,
}

impl Signature {
    pub fn param(&self, name: &str) -> Option<&DeclaredParam> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// A single entry in `InvocationSchema::parameters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
    pub description: String,
    pub required: bool,
}

/// The structured description of a tool offered to the completion service.
///
/// `parameters` keeps declaration order; every declared parameter appears
/// exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationSchema {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSchema>,
}

impl InvocationSchema {
    /// Names of the required parameters, in declaration order.
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSchema> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// JSON Schema document describing the argument object.
    pub fn parameters_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.parameters {
            properties.insert(
                p.name.clone(),
                json!({
                    "type": p.semantic_type.as_str(),
                    "description": p.description,
                }),
            );
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required(),
        })
    }

    /// The function-tool shape used by OpenAI-compatible chat endpoints.
    pub fn to_function_json(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters_json_schema(),
            }
        })
    }
}
