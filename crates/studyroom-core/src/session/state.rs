use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::energy::Energy;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Work,
    Break,
}

/// Coarse view of where the session is, derived from [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "period", rename_all = "lowercase")]
pub enum Phase {
    /// No duration selected yet, no countdown.
    Idle,
    Work(u32),
    /// Break following Work period `n`.
    Break(u32),
    Failed(u32),
    Finished,
}

/// Fixed period lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingPolicy {
    /// Minutes of requested study that make up one Work period.
    pub period_minutes: u32,
    pub work_period_secs: u64,
    pub break_secs: u64,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            period_minutes: 30,
            work_period_secs: 1800,
            break_secs: 300,
        }
    }
}

/// Validated number of Work periods for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPlan {
    total_periods: u32,
}

impl SessionPlan {
    /// Plan from a requested study duration. Minutes past the last full
    /// period are dropped.
    pub fn from_minutes(total_minutes: u32, period_minutes: u32) -> Result<Self, ValidationError> {
        if period_minutes == 0 {
            return Err(ValidationError::InvalidValue {
                field: "period_minutes".into(),
                message: "must be at least 1".into(),
            });
        }
        let total_periods = total_minutes / period_minutes;
        if total_periods == 0 {
            return Err(ValidationError::DurationTooShort {
                minutes: total_minutes,
                period_minutes,
            });
        }
        Ok(Self { total_periods })
    }

    pub fn periods(total_periods: u32) -> Result<Self, ValidationError> {
        if total_periods == 0 {
            return Err(ValidationError::InvalidValue {
                field: "total_periods".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(Self { total_periods })
    }

    pub fn total_periods(&self) -> u32 {
        self.total_periods
    }
}

/// The single mutable state of one study session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub(crate) session_id: Option<Uuid>,
    pub(crate) current_period: u32,
    pub(crate) total_periods: u32,
    pub(crate) mode: Mode,
    pub(crate) time_left_secs: u64,
    pub(crate) energy: Energy,
    /// Energy hit zero during Work. Freezes the countdown.
    pub(crate) failed: bool,
    /// User declared an upcoming legitimate screen-off.
    pub(crate) focus_mode_active: bool,
    pub(crate) hidden: bool,
    /// Transient verdict while a hidden interval is being reconciled.
    pub(crate) suspected_cheat: bool,
    pub(crate) timer_running: bool,
    pub(crate) finished: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            session_id: None,
            current_period: 1,
            total_periods: 1,
            mode: Mode::Work,
            time_left_secs: TimingPolicy::default().work_period_secs,
            energy: Energy::FULL,
            failed: false,
            focus_mode_active: false,
            hidden: false,
            suspected_cheat: false,
            timer_running: false,
            finished: false,
        }
    }
}

impl SessionState {
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn current_period(&self) -> u32 {
        self.current_period
    }

    pub fn total_periods(&self) -> u32 {
        self.total_periods
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn time_left_secs(&self) -> u64 {
        self.time_left_secs
    }

    pub fn energy(&self) -> Energy {
        self.energy
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn focus_mode_active(&self) -> bool {
        self.focus_mode_active
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn suspected_cheat(&self) -> bool {
        self.suspected_cheat
    }

    pub fn timer_running(&self) -> bool {
        self.timer_running
    }

    pub fn phase(&self) -> Phase {
        if self.finished {
            Phase::Finished
        } else if self.failed {
            Phase::Failed(self.current_period)
        } else if !self.timer_running {
            Phase::Idle
        } else {
            match self.mode {
                Mode::Work => Phase::Work(self.current_period),
                Mode::Break => Phase::Break(self.current_period),
            }
        }
    }

    /// `m:ss` countdown text.
    pub fn clock_label(&self) -> String {
        format!("{}:{:02}", self.time_left_secs / 60, self.time_left_secs % 60)
    }
}
