//! Tool directory scan rules.
//!
//! The rule set is evaluated once per refresh and yields a sorted candidate
//! list, so two scans of an unchanged directory produce the same units in the
//! same order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use kestrel_contracts::error::{KestrelError, KestrelResult};

/// Include/exclude rules for one directory scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanRules {
    /// File extensions (without the dot) that mark a tool unit.
    pub extensions: Vec<String>,
    /// File or directory names that are never visited.
    pub exclude: Vec<String>,
    /// Skip entries whose name starts with a dot.
    pub skip_hidden: bool,
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Deepest subdirectory level visited when `recursive` is set.
    pub max_depth: usize,
}

impl Default for ScanRules {
    fn default() -> Self {
        Self {
            extensions: vec!["toml".to_string()],
            exclude: [".git", "__pycache__", "target", "node_modules"]
                .into_iter()
                .map(String::from)
                .collect(),
            skip_hidden: true,
            recursive: false,
            max_depth: 8,
        }
    }
}

impl ScanRules {
    fn is_excluded(&self, name: &str) -> bool {
        (self.skip_hidden && name.starts_with('.')) || self.exclude.iter().any(|e| e == name)
    }

    fn has_unit_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
    }
}

/// Collect the tool unit files under `dir`, sorted.
///
/// A missing directory yields an empty list. `skip` (the baseline unit's
/// path) is left out even if it lies inside `dir`.
pub fn scan(dir: &Path, rules: &ScanRules, skip: Option<&Path>) -> KestrelResult<Vec<PathBuf>> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "tools directory does not exist yet");
        return Ok(Vec::new());
    }

    let skip = skip.and_then(|p| fs::canonicalize(p).ok());
    let mut found = Vec::new();
    visit(dir, rules, 0, &mut found)?;

    found.retain(|path| match (&skip, fs::canonicalize(path)) {
        (Some(skip), Ok(canonical)) => &canonical != skip,
        _ => true,
    });
    found.sort();
    Ok(found)
}

fn visit(dir: &Path, rules: &ScanRules, depth: usize, found: &mut Vec<PathBuf>) -> KestrelResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| KestrelError::UnitLoad {
        path: dir.display().to_string(),
        reason: format!("cannot read tools directory: {e}"),
    })?;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if rules.is_excluded(&name) {
            continue;
        }

        if path.is_dir() {
            if rules.recursive && depth < rules.max_depth {
                visit(&path, rules, depth + 1, found)?;
            }
        } else if rules.has_unit_extension(&path) {
            found.push(path);
        }
    }
    Ok(())
}
