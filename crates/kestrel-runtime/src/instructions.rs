//! The operating instructions placed in the first system Turn.

use std::path::Path;

use kestrel_contracts::error::{KestrelError, KestrelResult};

/// Instructions used when no `agent.instructions_file` is configured.
pub const DEFAULT_INSTRUCTIONS: &str = r#"You are a helpful assistant that can act on the machine you run on.

Your system consists of:
- Interface: the operator's messages and signal files
- Processing: tool units, TOML manifests in ./tools/{unit_name}.toml
- Memory: notes you keep in ./memory/{memory_name}.md

Your actions are:
- Read
- Create/Update
- Delete

You should improve yourself and the system. You can build tools and memory.
Observe your tool units and your memory and update them to improve
consistency, completeness and efficiency.

Every file in ./tools is reloaded before each of your requests, so a unit you
write is available on your next step. If a unit fails to load you fall back
to the built-in system tools until the operator's next message.

Example of a tool unit:

[[tool]]
name = "word_count"
doc = """
Count the words in a file

Args:
    path (str): file to read
    unique (bool): count distinct words only
"""
returns = "int"

[[tool.param]]
name = "path"
type = "str"

[[tool.param]]
name = "unique"
type = "bool"
default = false

[tool.run]
command = "python3"
args = ["word_count.py"]

The command receives its arguments as a JSON object in the KESTREL_INPUT
environment variable. Whatever it prints on stdout is the tool result.
"#;

/// Read the instructions from `path`, or return the built-in text.
pub fn load_instructions(path: Option<&Path>) -> KestrelResult<String> {
    match path {
        None => Ok(DEFAULT_INSTRUCTIONS.to_string()),
        Some(path) => std::fs::read_to_string(path).map_err(|e| KestrelError::ConfigError {
            reason: format!("failed to read instructions file '{}': {}", path.display(), e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use kestrel_registry::manifest::UnitManifest;

    use super::*;

    #[test]
    fn default_instructions_embed_a_valid_manifest() {
        let start = DEFAULT_INSTRUCTIONS.find("[[tool]]").unwrap();
        let end = DEFAULT_INSTRUCTIONS.find("The command receives").unwrap();

        let manifest = UnitManifest::from_toml_str(&DEFAULT_INSTRUCTIONS[start..end]).unwrap();

        assert_eq!(manifest.tools.len(), 1);
        assert_eq!(manifest.tools[0].name, "word_count");
    }

    #[test]
    fn instructions_file_is_read_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instructions.md");
        std::fs::write(&path, "Be brief.").unwrap();

        assert_eq!(load_instructions(Some(&path)).unwrap(), "Be brief.");
        assert_eq!(load_instructions(None).unwrap(), DEFAULT_INSTRUCTIONS);
    }

    #[test]
    fn missing_instructions_file_is_config_error() {
        let err = load_instructions(Some(Path::new("/nonexistent/instructions.md"))).unwrap_err();
        assert!(matches!(err, KestrelError::ConfigError { .. }));
    }
}
