use serde::{Deserialize, Serialize};

/// Counts rendering frames that arrive while the page is hidden.
///
/// Fed on every frame opportunity regardless of session state, so it is
/// already warm when the next hide happens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityProbe {
    hidden_since_ms: Option<u64>,
    frames_while_hidden: u64,
}

impl IntegrityProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// One frame callback.
    pub fn on_frame(&mut self, hidden: bool) {
        if hidden {
            self.frames_while_hidden = self.frames_while_hidden.saturating_add(1);
        } else {
            self.frames_while_hidden = 0;
        }
    }

    /// Re-arm on a visible -> hidden transition.
    pub fn arm(&mut self, now_ms: u64) {
        self.hidden_since_ms = Some(now_ms);
        self.frames_while_hidden = 0;
    }

    /// Consume the recorded hide instant. `None` if nothing is pending.
    pub fn take_hidden_since(&mut self) -> Option<u64> {
        self.hidden_since_ms.take()
    }

    pub fn hidden_since_ms(&self) -> Option<u64> {
        self.hidden_since_ms
    }

    pub fn frames_while_hidden(&self) -> u64 {
        self.frames_while_hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_only_hidden_frames() {
        let mut probe = IntegrityProbe::new();
        probe.on_frame(true);
        probe.on_frame(true);
        assert_eq!(probe.frames_while_hidden(), 2);
        probe.on_frame(false);
        assert_eq!(probe.frames_while_hidden(), 0);
    }

    #[test]
    fn arm_resets_counter_and_records_instant() {
        let mut probe = IntegrityProbe::new();
        for _ in 0..30 {
            probe.on_frame(true);
        }
        probe.arm(5_000);
        assert_eq!(probe.frames_while_hidden(), 0);
        assert_eq!(probe.take_hidden_since(), Some(5_000));
        assert_eq!(probe.take_hidden_since(), None);
    }
}
