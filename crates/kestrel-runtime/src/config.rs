//! Agent configuration.
//!
//! `AgentConfig` is read from a TOML file. Every field has a default, so an
//! empty file (or no file at all) is a valid configuration.
//!
//! ```toml
//! [agent]
//! instructions_file = "instructions.md"
//! max_tool_rounds = 100
//!
//! [registry]
//! tools_dir = "tools"
//!
//! [registry.scan]
//! recursive = true
//!
//! [completion]
//! base_url = "http://localhost:11434/v1"
//! model = "qwen2.5-coder"
//!
//! [input]
//! mode = "signals"
//! signal_dir = "signals"
//!
//! [approval]
//! mode = "prompt"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use kestrel_contracts::error::{KestrelError, KestrelResult};
use kestrel_core::orchestrator::LoopSettings;
use kestrel_registry::ScanRules;

/// Overrides `completion.base_url`.
pub const BASE_URL_ENV: &str = "KESTREL_BASE_URL";
/// Overrides `completion.model`.
pub const MODEL_ENV: &str = "KESTREL_MODEL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub agent: AgentSection,
    pub registry: RegistrySection,
    pub completion: CompletionSection,
    pub input: InputSection,
    pub approval: ApprovalSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// File holding the system instructions. Built-in text when unset.
    pub instructions_file: Option<PathBuf>,
    pub max_tool_rounds: usize,
    pub max_recoveries: usize,
    pub degrade_on_tool_error: bool,
}

impl Default for AgentSection {
    fn default() -> Self {
        let loop_defaults = LoopSettings::default();
        Self {
            instructions_file: None,
            max_tool_rounds: loop_defaults.max_tool_rounds,
            max_recoveries: loop_defaults.max_recoveries,
            degrade_on_tool_error: loop_defaults.degrade_on_tool_error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// Directory scanned for tool units on every refresh.
    pub tools_dir: Option<PathBuf>,
    /// Baseline unit file. The embedded `system` unit when unset.
    pub baseline: Option<PathBuf>,
    pub scan: ScanRules,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            tools_dir: Some(PathBuf::from("tools")),
            baseline: None,
            scan: ScanRules::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSection {
    /// Base URL of an OpenAI-compatible API, up to and including the version segment.
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for CompletionSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "KESTREL_API_KEY".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    #[default]
    Interactive,
    Signals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSection {
    pub mode: InputMode,
    pub signal_dir: PathBuf,
    pub poll_interval_ms: u64,
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            mode: InputMode::Interactive,
            signal_dir: PathBuf::from("signals"),
            poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalMode {
    /// Ask on the terminal.
    #[default]
    Prompt,
    /// Refuse every irreversible action without asking.
    Deny,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalSection {
    pub mode: ApprovalMode,
}

impl AgentConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `KestrelError::ConfigError` if the document is malformed or
    /// does not match `AgentConfig`.
    pub fn from_toml_str(s: &str) -> KestrelResult<Self> {
        toml::from_str(s).map_err(|e| KestrelError::ConfigError {
            reason: format!("failed to parse configuration TOML: {}", e),
        })
    }

    /// Read and parse the configuration file at `path`.
    pub fn from_file(path: &Path) -> KestrelResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| KestrelError::ConfigError {
            reason: format!("failed to read configuration file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply `KESTREL_BASE_URL` and `KESTREL_MODEL` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(BASE_URL_ENV) {
            debug!(base_url = %url, "base URL overridden from environment");
            self.completion.base_url = url;
        }
        if let Some(model) = lookup(MODEL_ENV) {
            debug!(model = %model, "model overridden from environment");
            self.completion.model = model;
        }
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            max_tool_rounds: self.agent.max_tool_rounds,
            max_recoveries: self.agent.max_recoveries,
            degrade_on_tool_error: self.agent.degrade_on_tool_error,
        }
    }
}

impl CompletionSection {
    /// Read the API key from the variable named by `api_key_env`.
    pub fn api_key(&self) -> KestrelResult<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| KestrelError::ConfigError {
                reason: format!("environment variable '{}' is not set", self.api_key_env),
            })
    }
}
