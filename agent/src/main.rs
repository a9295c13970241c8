//! kestrel: a tool-using agent that can write its own tools.
//!
//! Usage:
//!   kestrel run                       # interactive session
//!   kestrel run --signals inbox       # consume signal files from ./inbox
//!   kestrel tools                     # print the current tool schemas
//!   kestrel schema tools/math.toml    # print the schemas of one unit
//!   kestrel signal "check the logs"   # drop a signal for a running agent
//!
//! Configuration is read from `--config`, or `kestrel.toml` in the working
//! directory when present. `.env` is loaded first.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kestrel_contracts::{error::KestrelResult, schema::InvocationSchema, turn::Turn};
use kestrel_core::{gate::DenyAll, traits::Registry, CycleOutcome};
use kestrel_runtime::{
    build_agent, build_loader, build_registry, build_stimulus_source, AgentConfig, InputMode,
    SignalDirectory,
};

const DEFAULT_CONFIG: &str = "kestrel.toml";

// ── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "kestrel", about = "Self-extending tool-using agent", version)]
struct Cli {
    /// Configuration file. Defaults to ./kestrel.toml when it exists.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the agent loop.
    Run {
        /// Directory scanned for tool units.
        #[arg(long)]
        tools_dir: Option<PathBuf>,
        /// Read stimuli from signal files in DIR instead of the terminal.
        #[arg(long, value_name = "DIR")]
        signals: Option<PathBuf>,
    },
    /// Load every tool unit once and print the schema list as JSON.
    Tools {
        #[arg(long)]
        tools_dir: Option<PathBuf>,
    },
    /// Load one tool unit and print its schemas as JSON.
    Schema {
        unit: PathBuf,
    },
    /// Post a signal file for an agent running with `--signals`.
    Signal {
        text: String,
        /// Signal directory. Defaults to `input.signal_dir`.
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    dotenvy::dotenv().ok();

    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Command::Run { tools_dir, signals } => run(config, tools_dir, signals),
        Command::Tools { tools_dir } => list_tools(config, tools_dir),
        Command::Schema { unit } => show_unit(&unit),
        Command::Signal { text, dir } => post_signal(&config, &text, dir),
    });

    if let Err(e) = result {
        eprintln!("kestrel: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> KestrelResult<AgentConfig> {
    let mut config = match path {
        Some(path) => AgentConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).is_file() => AgentConfig::from_file(Path::new(DEFAULT_CONFIG))?,
        None => AgentConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn run(mut config: AgentConfig, tools_dir: Option<PathBuf>, signals: Option<PathBuf>) -> KestrelResult<()> {
    if let Some(dir) = tools_dir {
        config.registry.tools_dir = Some(dir);
    }
    if let Some(dir) = signals {
        config.input.mode = InputMode::Signals;
        config.input.signal_dir = dir;
    }

    let mut agent = build_agent(&config)?;
    let mut source = build_stimulus_source(&config.input);
    info!(mode = ?config.input.mode, "agent loop starting");

    agent.run_observed(source.as_mut(), print_cycle)
}

fn print_cycle(outcome: CycleOutcome, turns: &[Turn]) {
    for turn in turns {
        match turn {
            Turn::Assistant { content, tool_calls } if tool_calls.is_empty() => {
                println!("Assistant: {}", content);
            }
            Turn::Tool { tool_name, result, .. } => {
                println!("  [{} -> {}]", tool_name, result.status);
            }
            Turn::Error { content } => eprintln!("  [error] {}", content),
            _ => {}
        }
    }
    if outcome != CycleOutcome::Answered {
        eprintln!("  (cycle ended without an answer: {:?})", outcome);
    }
}

fn list_tools(mut config: AgentConfig, tools_dir: Option<PathBuf>) -> KestrelResult<()> {
    if let Some(dir) = tools_dir {
        config.registry.tools_dir = Some(dir);
    }
    let mut registry = build_registry(&config, Arc::new(DenyAll));
    registry.refresh()?;
    print_schemas(&registry.list_schemas());
    Ok(())
}

fn show_unit(path: &Path) -> KestrelResult<()> {
    let unit = build_loader(Arc::new(DenyAll)).load_unit(path, None)?;
    let schemas: Vec<InvocationSchema> = unit.tools.into_iter().map(|t| t.schema).collect();
    print_schemas(&schemas);
    Ok(())
}

fn post_signal(config: &AgentConfig, text: &str, dir: Option<PathBuf>) -> KestrelResult<()> {
    let dir = dir.unwrap_or_else(|| config.input.signal_dir.clone());
    let signals = SignalDirectory::new(dir, Duration::from_millis(config.input.poll_interval_ms));
    let path = signals.post(text)?;
    println!("{}", path.display());
    Ok(())
}

fn print_schemas(schemas: &[InvocationSchema]) {
    let tools: Vec<Value> = schemas.iter().map(InvocationSchema::to_function_json).collect();
    let rendered = serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string());
    println!("{}", rendered);
}
