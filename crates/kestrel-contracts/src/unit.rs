//! Identity of loaded tool units and external stimuli.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The name a tool unit is loaded under.
///
/// Generated names are `unit_` followed by the 32 hex digits of a random
/// UUIDv4, so two loads of the same file never share a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitName(pub String);

impl UnitName {
    pub const PREFIX: &'static str = "unit_";

    /// Produce a fresh, collision-free unit name.
    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, uuid::Uuid::new_v4().simple()))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a stimulus came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StimulusOrigin {
    Interactive,
    Signal { path: PathBuf },
}

/// One piece of external input delivered during AWAIT_INPUT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stimulus {
    pub text: String,
    pub origin: StimulusOrigin,
    pub received_at: DateTime<Utc>,
}

impl Stimulus {
    pub fn new(text: impl Into<String>, origin: StimulusOrigin) -> Self {
        Self {
            text: text.into(),
            origin,
            received_at: Utc::now(),
        }
    }

    /// True when the stimulus carries no new input for this cycle.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
