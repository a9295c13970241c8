//! # kestrel-tools
//!
//! The built-in tool bodies and the privileged baseline unit that binds them.
//!
//! Every irreversible tool (`write_file`, `delete_file`, `create_directory`,
//! `run_command`, `restart`) asks the injected `Approver` first and returns
//! `ToolOutput::Denied` when refused.

pub mod fs;
pub mod process;

use std::sync::Arc;

use kestrel_core::{gate::Approver, traits::Tool};

/// Name the baseline unit is registered under.
pub const SYSTEM_UNIT_NAME: &str = "system";

/// Manifest source of the baseline unit.
pub const SYSTEM_UNIT: &str = include_str!("../units/system.toml");

/// The built-in bodies, keyed by the name manifests bind with `run.builtin`.
pub fn standard_tools(approver: Arc<dyn Approver>) -> Vec<(&'static str, Arc<dyn Tool>)> {
    fn entry(name: &'static str, tool: impl Tool + 'static) -> (&'static str, Arc<dyn Tool>) {
        let tool: Arc<dyn Tool> = Arc::new(tool);
        (name, tool)
    }

    vec![
        entry("file_exists", fs::FileExists),
        entry("read_file", fs::ReadFile),
        entry("write_file", fs::WriteFile::new(approver.clone())),
        entry("delete_file", fs::DeleteFile::new(approver.clone())),
        entry("read_directory", fs::ReadDirectory),
        entry("create_directory", fs::CreateDirectory::new(approver.clone())),
        entry("run_command", process::RunCommand::new(approver.clone())),
        entry("restart", process::Restart::new(approver)),
    ]
}
