//! Stimulus sources for AWAIT_INPUT.
//!
//! - `InteractiveInput` reads one line per cycle from a terminal.
//! - `SignalDirectory` polls a directory and consumes the newest file.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tracing::{debug, info, warn};

use kestrel_contracts::{
    error::{KestrelError, KestrelResult},
    unit::{Stimulus, StimulusOrigin},
};
use kestrel_core::{
    gate::{strip_line_terminator, LineInput},
    traits::StimulusSource,
};

const PROMPT: &str = "You: ";

fn input_error(reason: String) -> KestrelError {
    KestrelError::Input { reason }
}

// ── Interactive ───────────────────────────────────────────────────────────────

/// Prompts on `output` and reads one line of `input` per stimulus.
///
/// End of input closes the source.
pub struct InteractiveInput<I, W> {
    input: I,
    output: W,
}

impl<I: LineInput, W: Write> InteractiveInput<I, W> {
    pub fn new(input: I, output: W) -> Self {
        Self { input, output }
    }
}

impl InteractiveInput<io::Stdin, io::Stdout> {
    pub fn stdin() -> Self {
        Self::new(io::stdin(), io::stdout())
    }
}

impl<I: LineInput, W: Write> StimulusSource for InteractiveInput<I, W> {
    fn next_stimulus(&mut self) -> KestrelResult<Option<Stimulus>> {
        write!(self.output, "{PROMPT}")
            .and_then(|_| self.output.flush())
            .map_err(|e| input_error(format!("cannot write prompt: {}", e)))?;

        let Some(line) = self
            .input
            .read_line_lossy()
            .map_err(|e| input_error(format!("cannot read input: {}", e)))?
        else {
            debug!("interactive input reached end of file");
            return Ok(None);
        };

        Ok(Some(Stimulus::new(
            strip_line_terminator(&line),
            StimulusOrigin::Interactive,
        )))
    }
}

// ── Signal directory ──────────────────────────────────────────────────────────

/// A directory of inbound signal files.
///
/// Each non-hidden regular file is one stimulus. The newest file (by
/// modification time, then name) is read and removed. Hidden files are
/// ignored, which lets `post` write through a hidden temporary name.
#[derive(Debug, Clone)]
pub struct SignalDirectory {
    dir: PathBuf,
    poll_interval: Duration,
}

impl SignalDirectory {
    pub fn new(dir: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            poll_interval,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Consume the newest signal, if any. A missing directory holds no signals.
    ///
    /// A selected file is always removed, even when it cannot be read, so one
    /// bad file never blocks the signals behind it. Invalid UTF-8 is replaced.
    pub fn take_newest(&self) -> KestrelResult<Option<Stimulus>> {
        let mut unremovable = HashSet::new();

        while let Some(path) = self.newest(&unremovable)? {
            let read = fs::read(&path);

            if let Err(e) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "cannot remove signal, skipping it");
                unremovable.insert(path);
                continue;
            }

            match read {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    info!(path = %path.display(), bytes = bytes.len(), "signal consumed");
                    return Ok(Some(Stimulus::new(text, StimulusOrigin::Signal { path })));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unreadable signal discarded");
                }
            }
        }
        Ok(None)
    }

    fn newest(&self, skip: &HashSet<PathBuf>) -> KestrelResult<Option<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(input_error(format!(
                    "cannot read signal directory '{}': {}",
                    self.dir.display(),
                    e
                )))
            }
        };

        let mut newest: Option<(SystemTime, String, PathBuf)> = None;
        for entry in entries {
            let entry = entry.map_err(|e| input_error(format!("cannot read signal entry: {}", e)))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || skip.contains(&entry.path()) {
                continue;
            }
            let meta = match entry.metadata() {
                Ok(meta) if meta.is_file() => meta,
                Ok(_) => continue,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "skipping unreadable signal");
                    continue;
                }
            };
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);

            let is_newer = newest
                .as_ref()
                .map_or(true, |(t, n, _)| (modified, name.as_str()) > (*t, n.as_str()));
            if is_newer {
                newest = Some((modified, name, entry.path()));
            }
        }
        Ok(newest.map(|(_, _, path)| path))
    }

    /// Drop `text` into the directory as a new signal named by the current
    /// UTC time. The file appears atomically under its final name.
    pub fn post(&self, text: &str) -> KestrelResult<PathBuf> {
        let fail = |what: &str, path: &Path, e: io::Error| {
            input_error(format!("cannot {} '{}': {}", what, path.display(), e))
        };

        fs::create_dir_all(&self.dir).map_err(|e| fail("create signal directory", &self.dir, e))?;

        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6fZ").to_string();
        let tmp = self.dir.join(format!(".{stamp}.tmp"));
        fs::write(&tmp, text).map_err(|e| fail("write signal", &tmp, e))?;

        let mut target = self.dir.join(format!("{stamp}.txt"));
        let mut suffix = 1;
        while target.exists() {
            target = self.dir.join(format!("{stamp}-{suffix}.txt"));
            suffix += 1;
        }
        fs::rename(&tmp, &target).map_err(|e| fail("publish signal", &target, e))?;

        debug!(path = %target.display(), "signal posted");
        Ok(target)
    }
}

impl StimulusSource for SignalDirectory {
    /// Poll until a signal arrives. The directory never closes, and a failed
    /// poll is retried on the next interval.
    fn next_stimulus(&mut self) -> KestrelResult<Option<Stimulus>> {
        loop {
            match self.take_newest() {
                Ok(Some(stimulus)) => return Ok(Some(stimulus)),
                Ok(None) => {}
                Err(e) => warn!(dir = %self.dir.display(), error = %e, "signal poll failed"),
            }
            thread::sleep(self.poll_interval);
        }
    }
}
