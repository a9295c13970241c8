//! Tools backed by an external process.
//!
//! ## Execution contract
//!
//! - Bound arguments are passed as a JSON object in the `KESTREL_INPUT`
//!   environment variable.
//! - The process writes its result to stdout. A JSON object or array is
//!   returned as structured output, anything else as text.
//! - Exit code 0 is success. A non-zero exit is a tool failure carrying
//!   stdout, stderr and the exit code.
//! - The working directory is the unit's directory when it has one.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use kestrel_contracts::{
    call::{Arguments, ToolOutput},
    error::{KestrelError, KestrelResult},
};
use kestrel_core::{
    gate::{denied_message, Approver},
    traits::Tool,
};

/// Environment variable carrying the argument object.
pub const INPUT_ENV: &str = "KESTREL_INPUT";

pub struct CommandTool {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    workdir: Option<PathBuf>,
    confirm: bool,
    approver: Arc<dyn Approver>,
}

impl CommandTool {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<PathBuf>,
        args: Vec<String>,
        workdir: Option<PathBuf>,
        confirm: bool,
        approver: Arc<dyn Approver>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            workdir,
            confirm,
            approver,
        }
    }
}

impl Tool for CommandTool {
    fn invoke(&self, args: &Arguments) -> KestrelResult<ToolOutput> {
        let input = args.to_value().to_string();

        if self.confirm {
            let action = format!("run tool {} with {}", self.name, input);
            if !self.approver.confirm(&action) {
                return Ok(ToolOutput::Denied(denied_message(&self.name, &input)));
            }
        }

        let mut command = Command::new(&self.program);
        command.args(&self.args).env(INPUT_ENV, &input);
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }

        debug!(tool = %self.name, program = %self.program.display(), "spawning tool process");
        let out = command.output().map_err(|e| {
            KestrelError::tool_failed(
                &self.name,
                format!("failed to launch '{}': {}", self.program.display(), e),
            )
        })?;

        let stdout = String::from_utf8_lossy(&out.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();

        if !out.status.success() {
            let code = out.status.code().unwrap_or(-1);
            warn!(tool = %self.name, exit = code, "tool process failed");

            let mut msg = stdout;
            if !stderr.is_empty() {
                if !msg.is_empty() {
                    msg.push('\n');
                }
                msg.push_str(&format!("[stderr]: {stderr}"));
            }
            msg.push_str(&format!("\n[exit: {code}]"));
            return Err(KestrelError::tool_failed(&self.name, msg.trim_start()));
        }

        Ok(parse_stdout(stdout))
    }
}

fn parse_stdout(stdout: String) -> ToolOutput {
    if stdout.is_empty() {
        return ToolOutput::Text("(no output)".to_string());
    }
    if stdout.starts_with('{') || stdout.starts_with('[') {
        if let Ok(value @ (Value::Object(_) | Value::Array(_))) = serde_json::from_str::<Value>(&stdout) {
            return ToolOutput::Structured(value);
        }
    }
    ToolOutput::Text(stdout)
}
