//! Process tools: shell commands and self-restart.

use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use kestrel_contracts::{
    call::{Arguments, ToolOutput},
    error::{KestrelError, KestrelResult},
};
use kestrel_core::{
    gate::{denied_message, Approver},
    traits::Tool,
};

fn shell(command: &str) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C");
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c");
        c
    };
    cmd.arg(command);
    cmd
}

/// Runs a shell command, in the foreground by default.
///
/// A foreground command that exits non-zero is a tool failure. A background
/// command is spawned and reaped on a detached thread; only the launch can fail.
pub struct RunCommand {
    approver: Arc<dyn Approver>,
}

impl RunCommand {
    pub fn new(approver: Arc<dyn Approver>) -> Self {
        Self { approver }
    }
}

impl Tool for RunCommand {
    fn invoke(&self, args: &Arguments) -> KestrelResult<ToolOutput> {
        let command = args.require_str("run_command", "command")?;
        let background = args.bool_or("run_command", "background", false)?;

        if !self.approver.confirm(&format!("run command {command}")) {
            return Ok(ToolOutput::Denied(denied_message("run_command", command)));
        }

        if background {
            let mut child = shell(command)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|e| KestrelError::tool_failed("run_command", format!("failed to start '{command}': {e}")))?;
            let pid = child.id();
            info!(command = %command, pid, "command started in background");

            // Reap the child so it does not linger as a zombie.
            thread::spawn(move || match child.wait() {
                Ok(status) => debug!(pid, %status, "background command exited"),
                Err(e) => warn!(pid, error = %e, "cannot wait for background command"),
            });

            return Ok(ToolOutput::Text(format!(
                "Command {command} started in background (pid {pid})."
            )));
        }

        let out = shell(command)
            .output()
            .map_err(|e| KestrelError::tool_failed("run_command", format!("failed to start '{command}': {e}")))?;
        let stdout = String::from_utf8_lossy(&out.stdout);

        if !out.status.success() {
            let code = out.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&out.stderr);
            warn!(command = %command, exit = code, "command failed");
            return Err(KestrelError::tool_failed(
                "run_command",
                format!("command '{command}' exited with status {code}: {}", stderr.trim()),
            ));
        }

        info!(command = %command, "command executed");
        Ok(ToolOutput::Text(format!(
            "Command {command} executed with output: {stdout}"
        )))
    }
}

/// Re-executes the running binary with the same arguments.
///
/// On Unix the process image is replaced in place, so a successful restart
/// never returns. Elsewhere a fresh process is started and this one exits.
pub struct Restart {
    approver: Arc<dyn Approver>,
}

impl Restart {
    pub fn new(approver: Arc<dyn Approver>) -> Self {
        Self { approver }
    }
}

impl Tool for Restart {
    fn invoke(&self, _args: &Arguments) -> KestrelResult<ToolOutput> {
        if !self.approver.confirm("restart the agent") {
            return Ok(ToolOutput::Denied(denied_message("restart", "")));
        }

        let exe = std::env::current_exe()
            .map_err(|e| KestrelError::tool_failed("restart", format!("cannot locate executable: {e}")))?;
        let mut cmd = Command::new(&exe);
        cmd.args(std::env::args_os().skip(1));
        warn!(exe = %exe.display(), "restarting agent");
        relaunch(cmd)
    }
}

#[cfg(unix)]
fn relaunch(mut cmd: Command) -> KestrelResult<ToolOutput> {
    use std::os::unix::process::CommandExt;

    let e = cmd.exec();
    Err(KestrelError::tool_failed("restart", format!("exec failed: {e}")))
}

#[cfg(not(unix))]
fn relaunch(mut cmd: Command) -> KestrelResult<ToolOutput> {
    cmd.spawn()
        .map_err(|e| KestrelError::tool_failed("restart", format!("relaunch failed: {e}")))?;
    std::process::exit(0)
}
