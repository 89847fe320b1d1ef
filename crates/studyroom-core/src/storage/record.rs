//! The persisted per-user document.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::energy::Score;
use crate::error::CoreError;
use crate::stats::SessionStats;

pub const DEFAULT_SKIN: &str = "default";
pub const DEFAULT_BACKGROUND: &str = "classroom.jpg";

/// Non-empty user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// # Errors
    /// Returns [`CoreError::MissingIdentity`] for a blank id.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(CoreError::MissingIdentity);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything that outlives a single session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub score: Score,
    #[serde(default = "default_skin")]
    pub current_skin: String,
    #[serde(default = "default_background")]
    pub current_background: String,
    #[serde(default)]
    pub stats: SessionStats,
}

fn default_skin() -> String {
    DEFAULT_SKIN.to_string()
}

fn default_background() -> String {
    DEFAULT_BACKGROUND.to_string()
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            score: Score::default(),
            current_skin: default_skin(),
            current_background: default_background(),
            stats: SessionStats::default(),
        }
    }
}

/// Progress stamped with the time it was written (epoch milliseconds).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(flatten)]
    pub progress: Progress,
    #[serde(default)]
    pub last_update: u64,
}

impl SessionRecord {
    pub fn new(progress: Progress, last_update: u64) -> Self {
        Self {
            progress,
            last_update,
        }
    }
}
