//! The Confirmation Gate.
//!
//! Irreversible tools (write, delete, create, run-command, restart) call
//! `Approver::confirm` before acting. Only an exact `y` or `Y` approves. Any
//! other answer denies, and so does no answer at all. A denial is a normal
//! outcome: the tool returns `ToolOutput::Denied` carrying `denied_message`.

use std::collections::VecDeque;
use std::io::{self, BufRead, Read, Write};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

/// A synchronous yes/no decision maker for irreversible actions.
pub trait Approver: Send + Sync {
    /// Ask whether `action` may proceed. Blocks until an answer is available.
    fn confirm(&self, action: &str) -> bool;
}

/// True only for the exact affirmative token, case-insensitively.
///
/// `"y"` and `"Y"` approve. `""`, `"n"`, `"no"`, `"yes"` and `"Y "` deny.
pub fn is_affirmative(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("y")
}

/// The uniform human-readable text a tool returns when the gate refuses.
pub fn denied_message(tool: &str, subject: &str) -> String {
    if subject.is_empty() {
        format!("denied: user declined {tool}")
    } else {
        format!("denied: user declined {tool} {subject}")
    }
}

// ── Line input ────────────────────────────────────────────────────────────────

/// A source of newline-terminated answers.
///
/// Stdin is read through its process-wide buffer, so the approver and an
/// interactive stimulus source can share it without stealing lines from
/// each other.
pub trait LineInput: Send {
    /// Append one line of raw bytes, terminator included, to `buf`.
    /// `Ok(0)` is end of input.
    fn read_raw_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;

    /// Read one line, replacing invalid UTF-8. `None` is end of input.
    fn read_line_lossy(&mut self) -> io::Result<Option<String>> {
        let mut buf = Vec::new();
        match self.read_raw_line(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(String::from_utf8_lossy(&buf).into_owned())),
        }
    }
}

impl LineInput for io::Stdin {
    fn read_raw_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        self.lock().read_until(b'\n', buf)
    }
}

impl<T: AsRef<[u8]> + Send> LineInput for io::Cursor<T> {
    fn read_raw_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        self.read_until(b'\n', buf)
    }
}

impl<R: Read + Send> LineInput for io::BufReader<R> {
    fn read_raw_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        self.read_until(b'\n', buf)
    }
}

/// Strip exactly one trailing `\n` or `\r\n`, nothing else.
pub fn strip_line_terminator(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}

// ── Line-oriented approver ────────────────────────────────────────────────────

/// An approver that writes the prompt to `output` and reads one line of
/// `input` as the answer.
///
/// Only the line terminator is stripped from the answer, so trailing spaces
/// still deny. End of input and read errors deny.
pub struct LineApprover<I, W> {
    io: Mutex<(I, W)>,
}

impl<I: LineInput, W: Write + Send> LineApprover<I, W> {
    pub fn new(input: I, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
        }
    }

    fn read_answer(&self, action: &str) -> Option<String> {
        let mut guard = self.io.lock().ok()?;
        let (input, output) = &mut *guard;

        write!(output, "{action}? (y/n) ").ok()?;
        output.flush().ok()?;

        let line = input.read_line_lossy().ok()??;
        Some(strip_line_terminator(&line).to_string())
    }
}

impl<I: LineInput, W: Write + Send> Approver for LineApprover<I, W> {
    fn confirm(&self, action: &str) -> bool {
        let approved = self
            .read_answer(action)
            .map(|answer| is_affirmative(&answer))
            .unwrap_or(false);
        info!(action = %action, approved, "confirmation gate answered");
        approved
    }
}

/// The interactive approver: prompts on stdout, reads stdin.
pub type TerminalApprover = LineApprover<io::Stdin, io::Stdout>;

/// Build the interactive approver.
pub fn terminal_approver() -> TerminalApprover {
    LineApprover::new(io::stdin(), io::stdout())
}

// ── Scripted approver ─────────────────────────────────────────────────────────

/// An approver that replays queued answers, for tests and unattended runs.
///
/// Every prompt is recorded. Once the queue is empty every request is denied.
#[derive(Clone, Default)]
pub struct ScriptedApprover {
    answers: Arc<Mutex<VecDeque<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedApprover {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Arc::new(Mutex::new(answers.into_iter().map(Into::into).collect())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every action description this approver has been asked about.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Approver for ScriptedApprover {
    fn confirm(&self, action: &str) -> bool {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(action.to_string());
        }
        let answer = self
            .answers
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_default();
        debug!(action = %action, answer = %answer, "scripted confirmation");
        is_affirmative(&answer)
    }
}

/// An approver that refuses everything. Used when no operator is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl Approver for DenyAll {
    fn confirm(&self, action: &str) -> bool {
        debug!(action = %action, "no operator attached, denying");
        false
    }
}
