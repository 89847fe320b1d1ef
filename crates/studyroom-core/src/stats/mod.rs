//! Accumulated study statistics.
//!
//! Stats outlive a single session: they are loaded with the user's record,
//! grow while the session runs, and are written back on every save.

use serde::{Deserialize, Serialize};

use crate::energy::{Level, Score};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    #[serde(rename = "focus_seconds", default)]
    pub total_focus_secs: u64,
    #[serde(rename = "switches", default)]
    pub tab_switch_count: u64,
    /// One floored energy snapshot per completed Work period.
    #[serde(rename = "history", default)]
    pub period_history: Vec<u32>,
}

impl SessionStats {
    /// Mean energy snapshot across completed Work periods, 0 when none.
    pub fn average_focus(&self) -> f64 {
        if self.period_history.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.period_history.iter().map(|&v| v as u64).sum();
        sum as f64 / self.period_history.len() as f64
    }

    pub fn summarize(&self, score: Score) -> SessionSummary {
        SessionSummary {
            periods_completed: self.period_history.len(),
            average_focus: (self.average_focus() * 100.0).round() / 100.0,
            total_focus_secs: self.total_focus_secs,
            tab_switches: self.tab_switch_count,
            score: score.points(),
            level: score.level(),
        }
    }
}

/// End-of-session report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub periods_completed: usize,
    /// Average focus percentage, rounded to two decimals.
    pub average_focus: f64,
    pub total_focus_secs: u64,
    pub tab_switches: u64,
    pub score: u32,
    pub level: Level,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_of_empty_history_is_zero() {
        assert_eq!(SessionStats::default().average_focus(), 0.0);
    }

    #[test]
    fn summary_rounds_average() {
        let stats = SessionStats {
            total_focus_secs: 3600,
            tab_switch_count: 2,
            period_history: vec![100, 67, 50],
        };
        let summary = stats.summarize(Score::new(55));
        assert_eq!(summary.periods_completed, 3);
        assert_eq!(summary.average_focus, 72.33);
        assert_eq!(summary.level, Level::Three);
    }

    #[test]
    fn wire_names_match_record_format() {
        let stats = SessionStats {
            total_focus_secs: 5,
            tab_switch_count: 1,
            period_history: vec![90],
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["focus_seconds"], 5);
        assert_eq!(json["switches"], 1);
        assert_eq!(json["history"][0], 90);
    }
}
