use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::integrity::Verdict;
use crate::session::Mode;
use crate::stats::SessionSummary;

/// Every state change in the session produces an Event.
/// The driver routes them to the observer, the status sink and the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        total_periods: u32,
        at: DateTime<Utc>,
    },
    /// The countdown must (re)start. Any previous countdown is replaced.
    TimerStarted {
        period: u32,
        mode: Mode,
        time_left_secs: u64,
        at: DateTime<Utc>,
    },
    /// The countdown must stop.
    TimerStopped {
        reason: StopReason,
        at: DateTime<Utc>,
    },
    Ticked {
        period: u32,
        mode: Mode,
        time_left_secs: u64,
        energy: f64,
        at: DateTime<Utc>,
    },
    PeriodCompleted {
        period: u32,
        energy_snapshot: u32,
        points_awarded: u32,
        at: DateTime<Utc>,
    },
    BreakStarted {
        after_period: u32,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    WorkStarted {
        period: u32,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    SessionFinished {
        summary: SessionSummary,
        at: DateTime<Utc>,
    },
    EnergyDepleted {
        period: u32,
        points_lost: u32,
        score: u32,
        at: DateTime<Utc>,
    },
    Restarted {
        period: u32,
        at: DateTime<Utc>,
    },
    FocusModeChanged {
        active: bool,
        at: DateTime<Utc>,
    },
    /// Result of reconciling a hidden interval on return to the page.
    HiddenReconciled {
        elapsed_secs: u64,
        frames_while_hidden: u64,
        verdict: Verdict,
        energy: f64,
        time_left_secs: u64,
        at: DateTime<Utc>,
    },
    /// Blocking warning for the user: the hidden interval looked like app switching.
    CheatSuspected {
        elapsed_secs: u64,
        energy_lost: f64,
        at: DateTime<Utc>,
    },
    StatusChanged {
        status: PresenceStatus,
        at: DateTime<Utc>,
    },
    ScoreRedeemed {
        cost: u32,
        remaining: u32,
        at: DateTime<Utc>,
    },
    CosmeticEquipped {
        slot: CosmeticSlot,
        item: String,
        at: DateTime<Utc>,
    },
    /// Progress changed and should be persisted. Fire-and-forget.
    SaveRequested {
        reason: SaveReason,
        at: DateTime<Utc>,
    },
}

/// Presence label pushed to the status collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceStatus {
    #[serde(rename = "online")]
    Online,
    #[serde(rename = "online (hidden, legitimate)")]
    OnlineHidden,
    #[serde(rename = "switched away")]
    SwitchedAway,
}

impl PresenceStatus {
    pub fn label(self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::OnlineHidden => "online (hidden, legitimate)",
            PresenceStatus::SwitchedAway => "switched away",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Failed,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveReason {
    PeriodPassed,
    EnergyDepleted,
    SessionFinished,
    Redeemed,
    Equipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CosmeticSlot {
    Skin,
    Background,
}

impl Event {
    /// Whether the event is the user-facing blocking warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, Event::CheatSuspected { .. })
    }
}
