//! Visibility-based integrity detection.
//!
//! A real screen lock or device sleep stops the rendering pipeline almost
//! immediately. If frames keep arriving for a long hidden interval, the page
//! was only covered by another window or app, whatever the user declared.
//!
//! This is a client-side deterrent, not a security boundary.

mod probe;
mod reconciler;

pub use probe::IntegrityProbe;
pub use reconciler::{classify, Verdict, VisibilityReconciler};

use serde::{Deserialize, Serialize};

/// Thresholds for flagging a declared screen-off as app switching.
/// Configurable under `[integrity]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityPolicy {
    /// Hidden intervals must last strictly longer than this to be flagged.
    pub min_hidden_secs: u64,
    /// More frames than this while hidden means rendering never stopped.
    pub max_frames_while_hidden: u64,
}

impl Default for IntegrityPolicy {
    fn default() -> Self {
        Self {
            min_hidden_secs: 5,
            max_frames_while_hidden: 15,
        }
    }
}
