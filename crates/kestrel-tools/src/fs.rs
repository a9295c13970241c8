//! File and directory tools.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use kestrel_contracts::{
    call::{Arguments, ToolOutput},
    error::{KestrelError, KestrelResult},
};
use kestrel_core::{
    gate::{denied_message, Approver},
    traits::Tool,
};

/// Directory names `read_directory` never descends into.
const SKIPPED_DIRS: &[&str] = &[".git", "__pycache__"];

fn io_failure(tool: &str, path: &str, e: std::io::Error) -> KestrelError {
    KestrelError::tool_failed(tool, format!("{path}: {e}"))
}

pub struct FileExists;

impl Tool for FileExists {
    fn invoke(&self, args: &Arguments) -> KestrelResult<ToolOutput> {
        let path = args.require_str("file_exists", "path")?;
        let text = if Path::new(path).is_file() {
            format!("File {path} exists.")
        } else {
            format!("File {path} does not exist.")
        };
        Ok(ToolOutput::Text(text))
    }
}

pub struct ReadFile;

impl Tool for ReadFile {
    fn invoke(&self, args: &Arguments) -> KestrelResult<ToolOutput> {
        let path = args.require_str("read_file", "path")?;
        let content = fs::read_to_string(path).map_err(|e| io_failure("read_file", path, e))?;
        Ok(ToolOutput::Text(content))
    }
}

pub struct WriteFile {
    approver: Arc<dyn Approver>,
}

impl WriteFile {
    pub fn new(approver: Arc<dyn Approver>) -> Self {
        Self { approver }
    }
}

impl Tool for WriteFile {
    fn invoke(&self, args: &Arguments) -> KestrelResult<ToolOutput> {
        let path = args.require_str("write_file", "path")?;
        let content = args.require_str("write_file", "content")?;

        if !self.approver.confirm(&format!("write file {path}")) {
            return Ok(ToolOutput::Denied(denied_message("write_file", path)));
        }

        fs::write(path, content).map_err(|e| io_failure("write_file", path, e))?;
        info!(path = %path, bytes = content.len(), "file written");
        Ok(ToolOutput::Text(format!("File {path} written successfully.")))
    }
}

pub struct DeleteFile {
    approver: Arc<dyn Approver>,
}

impl DeleteFile {
    pub fn new(approver: Arc<dyn Approver>) -> Self {
        Self { approver }
    }
}

impl Tool for DeleteFile {
    fn invoke(&self, args: &Arguments) -> KestrelResult<ToolOutput> {
        let path = args.require_str("delete_file", "path")?;

        if !self.approver.confirm(&format!("delete file {path}")) {
            return Ok(ToolOutput::Denied(denied_message("delete_file", path)));
        }

        fs::remove_file(path).map_err(|e| io_failure("delete_file", path, e))?;
        info!(path = %path, "file deleted");
        Ok(ToolOutput::Text(format!("File {path} deleted successfully.")))
    }
}

/// Recursive listing of non-hidden files.
///
/// Subdirectories are only visited when the requested path is relative, so
/// a request for `/` lists the top level and stops.
pub struct ReadDirectory;

impl Tool for ReadDirectory {
    fn invoke(&self, args: &Arguments) -> KestrelResult<ToolOutput> {
        let path = args.require_str("read_directory", "path")?;
        let root = Path::new(path);
        let recurse = !root.is_absolute();

        let mut files = Vec::new();
        list_files(root, recurse, &mut files).map_err(|e| io_failure("read_directory", path, e))?;
        files.sort();

        let listing = files
            .into_iter()
            .map(|p| Value::String(p.display().to_string()))
            .collect();
        Ok(ToolOutput::Structured(Value::Array(listing)))
    }
}

fn list_files(dir: &Path, recurse: bool, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let path = entry.path();

        if path.is_file() {
            if !name.starts_with('.') {
                files.push(path);
            }
        } else if path.is_dir() && recurse && !SKIPPED_DIRS.iter().any(|s| name.contains(s)) {
            list_files(&path, recurse, files)?;
        }
    }
    Ok(())
}

pub struct CreateDirectory {
    approver: Arc<dyn Approver>,
}

impl CreateDirectory {
    pub fn new(approver: Arc<dyn Approver>) -> Self {
        Self { approver }
    }
}

impl Tool for CreateDirectory {
    fn invoke(&self, args: &Arguments) -> KestrelResult<ToolOutput> {
        let path = args.require_str("create_directory", "path")?;

        if !self.approver.confirm(&format!("create directory {path}")) {
            return Ok(ToolOutput::Denied(denied_message("create_directory", path)));
        }

        fs::create_dir_all(path).map_err(|e| io_failure("create_directory", path, e))?;
        info!(path = %path, "directory created");
        Ok(ToolOutput::Text(format!("Directory {path} created successfully.")))
    }
}
