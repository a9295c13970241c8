//! Core trait definitions for the kestrel orchestration loop.
//!
//! These four traits are the seams between the loop and its collaborators:
//!
//! - `Tool`: one callable body (native or external process)
//! - `Registry`: the live set of tools, rebuilt every cycle
//! - `CompletionService`: the language model, treated as a black-box RPC
//! - `StimulusSource`: where AWAIT_INPUT gets its next input
//!
//! The loop only ever talks to these traits; concrete implementations live in
//! `kestrel-registry`, `kestrel-tools`, and `kestrel-runtime`.

use kestrel_contracts::{
    call::{Arguments, Dispatched, ToolOutput},
    decision::Decision,
    error::KestrelResult,
    schema::InvocationSchema,
    turn::Turn,
    unit::Stimulus,
};

/// A callable tool body.
///
/// `invoke` receives arguments already bound against the tool's signature:
/// unknown names rejected, defaults filled in, types validated. An `Err` is a
/// tool failure; the registry turns it into a `tool-error` result. A refusal by
/// the Confirmation Gate is not an error and comes back as `ToolOutput::Denied`.
pub trait Tool: Send + Sync {
    fn invoke(&self, args: &Arguments) -> KestrelResult<ToolOutput>;
}

/// The live tool registry.
///
/// `refresh` takes `&mut self` and `dispatch` takes `&self`, so a dispatch can
/// never observe a registry in the middle of a rebuild.
pub trait Registry: Send {
    /// Rescan every configured unit and replace the descriptor set wholesale.
    ///
    /// On `Err` the previous descriptor set is left untouched.
    fn refresh(&mut self) -> KestrelResult<()>;

    /// Replace the descriptor set with the privileged baseline unit only.
    fn reset_to_baseline(&mut self) -> KestrelResult<()>;

    /// Schemas of the current descriptor set, for the next decision request.
    fn list_schemas(&self) -> Vec<InvocationSchema>;

    /// Invoke `name` with `arguments`. Never fails: every outcome is data.
    ///
    /// `Dispatched::body_failed` tells a failing tool body apart from a
    /// lookup miss or rejected arguments.
    fn dispatch(&self, name: &str, arguments: &Arguments) -> Dispatched;
}

/// The language-model completion service.
pub trait CompletionService: Send {
    /// Request a decision for the full conversation with `tools` attached.
    ///
    /// Any transport or protocol failure is `KestrelError::DecisionRequest`.
    fn complete(&self, turns: &[Turn], tools: &[InvocationSchema]) -> KestrelResult<Decision>;
}

/// A source of external input for AWAIT_INPUT.
pub trait StimulusSource {
    /// Block until the next stimulus is available.
    ///
    /// `Ok(None)` means the source is closed (for example stdin reached EOF)
    /// and the host is shutting the loop down.
    fn next_stimulus(&mut self) -> KestrelResult<Option<Stimulus>>;
}
