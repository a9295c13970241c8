//! Argument binding against a tool's declared signature.
//!
//! Binding runs in two phases:
//!
//! 1. **Names**: unknown argument names and missing required parameters are
//!    rejected; omitted optional parameters receive their declared defaults.
//! 2. **Types**: the bound object is validated against the parameter JSON
//!    Schema with the `jsonschema` crate. All violations are collected so the
//!    completion service sees every problem in one result.

use jsonschema::Validator;
use tracing::debug;

use kestrel_contracts::{
    call::Arguments,
    error::{KestrelError, KestrelResult},
    schema::{InvocationSchema, Signature},
};

/// A compiled argument validator for one tool.
pub struct ArgumentBinder {
    signature: Signature,
    validator: Validator,
}

impl ArgumentBinder {
    /// Compile the validator for `schema`.
    ///
    /// The error string describes why the generated JSON Schema was rejected.
    pub fn new(signature: Signature, schema: &InvocationSchema) -> Result<Self, String> {
        let validator = jsonschema::validator_for(&schema.parameters_json_schema())
            .map_err(|e| format!("cannot compile argument schema for '{}': {}", signature.name, e))?;
        Ok(Self { signature, validator })
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Bind `args` to the signature, returning the argument set the tool body
    /// receives.
    pub fn bind(&self, args: &Arguments) -> KestrelResult<Arguments> {
        let tool = &self.signature.name;

        // ── Phase 1: names and defaults ──────────────────────────────────────
        if let Some(unknown) = args.keys().find(|k| self.signature.param(k).is_none()) {
            return Err(KestrelError::invalid_arguments(
                tool,
                format!("unexpected argument '{unknown}'"),
            ));
        }

        let mut bound = args.clone();
        for param in &self.signature.params {
            if bound.contains(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => bound.insert(param.name.clone(), default.clone()),
                None => {
                    return Err(KestrelError::invalid_arguments(
                        tool,
                        format!("missing required argument '{}'", param.name),
                    ))
                }
            }
        }

        // ── Phase 2: JSON Schema validation ──────────────────────────────────
        let instance = bound.to_value();
        let violations: Vec<String> = self
            .validator
            .iter_errors(&instance)
            .map(|error| {
                let at = error.instance_path.to_string();
                if at.is_empty() {
                    error.to_string()
                } else {
                    format!("{at}: {error}")
                }
            })
            .collect();

        if !violations.is_empty() {
            debug!(tool = %tool, count = violations.len(), "argument validation failed");
            return Err(KestrelError::invalid_arguments(tool, violations.join("; ")));
        }

        Ok(bound)
    }
}
