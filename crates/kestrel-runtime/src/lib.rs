//! # kestrel-runtime
//!
//! Assembles a runnable agent from an `AgentConfig`:
//!
//! - `config`: TOML configuration with environment overrides
//! - `client`: OpenAI-compatible chat completions client
//! - `stimulus`: interactive and signal-directory stimulus sources
//! - `instructions`: the first system Turn
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = AgentConfig::from_file(Path::new("kestrel.toml"))?;
//! let mut agent = build_agent(&config)?;
//! let mut source = build_stimulus_source(&config.input);
//! agent.run(source.as_mut())?;
//! ```

pub mod client;
pub mod config;
pub mod instructions;
pub mod stimulus;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use kestrel_contracts::error::KestrelResult;
use kestrel_core::{
    gate::{terminal_approver, Approver, DenyAll},
    traits::{CompletionService, StimulusSource},
    Orchestrator,
};
use kestrel_registry::{BaselineUnit, BuiltinCatalog, RegistryConfig, ToolRegistry, UnitLoader};
use kestrel_tools::{standard_tools, SYSTEM_UNIT, SYSTEM_UNIT_NAME};

pub use client::ChatCompletionsClient;
pub use config::{AgentConfig, ApprovalMode, InputMode};
pub use instructions::{load_instructions, DEFAULT_INSTRUCTIONS};
pub use stimulus::{InteractiveInput, SignalDirectory};

pub fn build_approver(mode: ApprovalMode) -> Arc<dyn Approver> {
    match mode {
        ApprovalMode::Prompt => Arc::new(terminal_approver()),
        ApprovalMode::Deny => Arc::new(DenyAll),
    }
}

/// A loader whose catalog holds every built-in tool body.
pub fn build_loader(approver: Arc<dyn Approver>) -> UnitLoader {
    let catalog: BuiltinCatalog = standard_tools(approver.clone()).into_iter().collect();
    UnitLoader::new(catalog, approver)
}

/// An empty registry over the configured tools directory and baseline unit.
pub fn build_registry(config: &AgentConfig, approver: Arc<dyn Approver>) -> ToolRegistry {
    let baseline = match &config.registry.baseline {
        Some(path) => BaselineUnit::File(path.clone()),
        None => BaselineUnit::Embedded {
            name: SYSTEM_UNIT_NAME.to_string(),
            source: SYSTEM_UNIT.to_string(),
        },
    };
    let registry_config = RegistryConfig {
        tools_dir: config.registry.tools_dir.clone(),
        baseline,
        scan: config.registry.scan.clone(),
    };
    ToolRegistry::new(registry_config, build_loader(approver))
}

/// An orchestrator talking to `service`, with tools gated by `approver`.
pub fn build_orchestrator(
    config: &AgentConfig,
    service: Box<dyn CompletionService>,
    approver: Arc<dyn Approver>,
) -> KestrelResult<Orchestrator> {
    let instructions = load_instructions(config.agent.instructions_file.as_deref())?;
    let registry = build_registry(config, approver);
    Ok(Orchestrator::new(
        Box::new(registry),
        service,
        instructions,
        config.loop_settings(),
    ))
}

/// The full agent: HTTP completion client plus the configured approver.
pub fn build_agent(config: &AgentConfig) -> KestrelResult<Orchestrator> {
    let client = ChatCompletionsClient::from_config(&config.completion)?;
    info!(
        endpoint = %client.endpoint(),
        model = %config.completion.model,
        approval = ?config.approval.mode,
        "agent assembled"
    );
    build_orchestrator(config, Box::new(client), build_approver(config.approval.mode))
}

pub fn build_stimulus_source(input: &config::InputSection) -> Box<dyn StimulusSource> {
    match input.mode {
        InputMode::Interactive => Box::new(InteractiveInput::stdin()),
        InputMode::Signals => Box::new(SignalDirectory::new(
            input.signal_dir.clone(),
            Duration::from_millis(input.poll_interval_ms),
        )),
    }
}
