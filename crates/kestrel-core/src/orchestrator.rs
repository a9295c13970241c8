//! The kestrel orchestration loop.
//!
//! One cycle walks this state machine:
//!
//!   AWAIT_INPUT → REQUEST_DECISION ⇄ DISPATCH_CALLS → APPEND_RESULT
//!                        ↑    │
//!                        └ RECOVER
//!
//! - REQUEST_DECISION refreshes the registry (unless the cycle is degraded)
//!   and sends the whole conversation plus the fresh schema list.
//! - DISPATCH_CALLS appends the decision as an assistant Turn, then one tool
//!   Turn per call, before the next decision is requested.
//! - APPEND_RESULT appends the final answer and ends the cycle.
//! - RECOVER resets the registry to the baseline unit, records the failure as
//!   an error Turn and goes back to REQUEST_DECISION with the smaller set.
//!
//! There is no terminal state: `run` only returns when the stimulus source
//! closes.

use tracing::{debug, error, info, warn};

use kestrel_contracts::{
    call::{ExecutionResult, PendingToolCall},
    decision::Decision,
    error::{KestrelError, KestrelResult},
    turn::Turn,
};

use crate::{
    conversation::Conversation,
    traits::{CompletionService, Registry, StimulusSource},
};

/// Tunables for the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSettings {
    /// Call rounds allowed per cycle before the cycle is cut short.
    pub max_tool_rounds: usize,
    /// Consecutive RECOVER entries allowed per cycle.
    pub max_recoveries: usize,
    /// Fall back to the baseline tool set after a dispatch returns `tool-error`.
    pub degrade_on_tool_error: bool,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: 100,
            max_recoveries: 3,
            degrade_on_tool_error: true,
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A decision without calls arrived and was appended as an assistant Turn.
    Answered,
    /// `max_tool_rounds` was reached; an error Turn records it.
    RoundLimit,
    /// RECOVER was entered more than `max_recoveries` times.
    Exhausted,
}

enum LoopState {
    RequestDecision,
    DispatchCalls(Decision),
    AppendResult(Decision),
    Recover(KestrelError),
}

/// Drives the conversation between the completion service and the tools.
pub struct Orchestrator {
    registry: Box<dyn Registry>,
    service: Box<dyn CompletionService>,
    conversation: Conversation,
    settings: LoopSettings,
    cycle: u64,
}

impl Orchestrator {
    /// The conversation starts with exactly one system Turn holding `instructions`.
    pub fn new(
        registry: Box<dyn Registry>,
        service: Box<dyn CompletionService>,
        instructions: impl Into<String>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            registry,
            service,
            conversation: Conversation::new(instructions),
            settings,
            cycle: 0,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn registry(&self) -> &dyn Registry {
        self.registry.as_ref()
    }

    /// Run AWAIT_INPUT → cycle forever, until `source` closes.
    ///
    /// Cycle failures never end the loop. A failing stimulus source does,
    /// since there is no input to continue with.
    pub fn run(&mut self, source: &mut dyn StimulusSource) -> KestrelResult<()> {
        self.run_observed(source, |_, _| {})
    }

    /// Like `run`, calling `observe` after every cycle with its outcome and
    /// the Turns that cycle appended.
    pub fn run_observed<F>(&mut self, source: &mut dyn StimulusSource, mut observe: F) -> KestrelResult<()>
    where
        F: FnMut(CycleOutcome, &[Turn]),
    {
        loop {
            let stimulus = match source.next_stimulus()? {
                Some(stimulus) => stimulus,
                None => {
                    info!(cycles = self.cycle, "stimulus source closed, stopping loop");
                    return Ok(());
                }
            };

            let start = self.conversation.len();
            let outcome = self.run_cycle(Some(&stimulus.text));
            debug!(cycle = self.cycle, ?outcome, "cycle finished");
            observe(outcome, &self.conversation.turns()[start..]);
        }
    }

    /// Execute one cycle starting from AWAIT_INPUT with `stimulus` already read.
    ///
    /// A blank or absent stimulus is "no new input": nothing is appended, but a
    /// decision is still requested.
    pub fn run_cycle(&mut self, stimulus: Option<&str>) -> CycleOutcome {
        self.cycle += 1;
        let cycle = self.cycle;

        match stimulus.filter(|text| !text.trim().is_empty()) {
            Some(text) => {
                self.conversation.push(Turn::user(text));
            }
            None => debug!(cycle, "no new input this cycle"),
        }

        let mut degraded = false;
        let mut rounds = 0usize;
        let mut recoveries = 0usize;
        let mut state = LoopState::RequestDecision;

        loop {
            state = match state {
                // ── REQUEST_DECISION ─────────────────────────────────────────
                LoopState::RequestDecision => match self.request_decision(degraded) {
                    Ok(decision) if decision.has_calls() => LoopState::DispatchCalls(decision),
                    Ok(decision) => LoopState::AppendResult(decision),
                    Err(e) => LoopState::Recover(e),
                },

                // ── DISPATCH_CALLS ───────────────────────────────────────────
                LoopState::DispatchCalls(decision) => {
                    if rounds >= self.settings.max_tool_rounds {
                        warn!(cycle, rounds, "tool round limit reached, ending cycle");
                        self.conversation.push(Turn::error(format!(
                            "tool call limit of {} rounds reached; cycle ended before a final answer",
                            self.settings.max_tool_rounds
                        )));
                        return CycleOutcome::RoundLimit;
                    }
                    rounds += 1;

                    let tool_failed = self.dispatch_calls(decision, cycle, rounds);
                    if tool_failed && self.settings.degrade_on_tool_error && !degraded {
                        warn!(cycle, "tool failed, continuing cycle with baseline tools");
                        self.fall_back_to_baseline(cycle);
                        degraded = true;
                    }
                    LoopState::RequestDecision
                }

                // ── APPEND_RESULT ────────────────────────────────────────────
                LoopState::AppendResult(decision) => {
                    info!(cycle, rounds, "decision complete");
                    self.conversation.push(Turn::assistant(decision.content));
                    return CycleOutcome::Answered;
                }

                // ── RECOVER ──────────────────────────────────────────────────
                LoopState::Recover(err) => {
                    recoveries += 1;
                    error!(
                        cycle,
                        attempt = recoveries,
                        kind = ?err.kind(),
                        error = %err,
                        "cycle failed, recovering with baseline tools"
                    );

                    self.fall_back_to_baseline(cycle);
                    degraded = true;
                    self.conversation.push(Turn::error(err.to_string()));

                    if recoveries > self.settings.max_recoveries {
                        warn!(cycle, recoveries, "recovery attempts exhausted, awaiting new input");
                        return CycleOutcome::Exhausted;
                    }
                    LoopState::RequestDecision
                }
            };
        }
    }

    fn request_decision(&mut self, degraded: bool) -> KestrelResult<Decision> {
        if !degraded {
            self.registry.refresh()?;
        }
        let schemas = self.registry.list_schemas();

        debug!(
            cycle = self.cycle,
            tools = schemas.len(),
            turns = self.conversation.len(),
            degraded,
            "requesting decision"
        );
        self.service.complete(self.conversation.turns(), &schemas)
    }

    /// Append the decision and one tool Turn per call. Returns true if any
    /// tool body failed. Rejected arguments and unknown names do not count.
    fn dispatch_calls(&mut self, decision: Decision, cycle: u64, round: usize) -> bool {
        let calls = decision.tool_calls.clone();
        let origin = self.conversation.push(Turn::Assistant {
            content: decision.content,
            tool_calls: decision.tool_calls,
        });

        let mut tool_failed = false;
        for request in &calls {
            let pending = PendingToolCall::from_request(request, origin);

            let result = match &pending.arguments {
                Ok(args) => {
                    let dispatched = self.registry.dispatch(&pending.tool_name, args);
                    tool_failed |= dispatched.body_failed;
                    dispatched.result
                }
                Err(reason) => ExecutionResult::tool_error(reason.clone()),
            };

            info!(
                cycle,
                round,
                call_id = %pending.call_id,
                tool = %pending.tool_name,
                status = %result.status,
                "tool call dispatched"
            );

            self.conversation.push(Turn::Tool {
                call_id: pending.call_id,
                tool_name: pending.tool_name,
                result,
            });
        }
        tool_failed
    }

    fn fall_back_to_baseline(&mut self, cycle: u64) {
        if let Err(e) = self.registry.reset_to_baseline() {
            error!(cycle, error = %e, "baseline tool unit failed to load");
            self.conversation.push(Turn::error(e.to_string()));
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
