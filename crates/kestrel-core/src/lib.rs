//! # kestrel-core
//!
//! The self-extending tool-calling loop.
//!
//! This crate provides:
//! - The trait seams (`Tool`, `Registry`, `CompletionService`, `StimulusSource`)
//! - The Confirmation Gate (`Approver` and its implementations)
//! - The append-only `Conversation`
//! - The `Orchestrator` that drives one cycle after another
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kestrel_core::{Orchestrator, orchestrator::LoopSettings};
//!
//! let mut agent = Orchestrator::new(registry, service, instructions, LoopSettings::default());
//! agent.run(&mut stdin_source)?;
//! ```

pub mod conversation;
pub mod gate;
pub mod orchestrator;
pub mod traits;

pub use conversation::Conversation;
pub use orchestrator::{CycleOutcome, LoopSettings, Orchestrator};
