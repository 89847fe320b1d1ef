//! # Studyroom Core Library
//!
//! Core logic for a timed focus session with visibility-based integrity
//! checks. The CLI binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Session**: countdown state machine over Work and Break periods, driven
//!   one [`Command`] at a time by [`FocusSession`]
//! - **Integrity**: frame probe plus reconciler that settles hidden time when
//!   the page becomes visible again
//! - **Storage**: SQLite record store and TOML configuration
//! - **Sync**: last-write-wins pairing of the local cache and shared store
//! - **Runtime**: tokio event loop owning the single countdown and the
//!   fire-and-forget saves
//!
//! ## Key Components
//!
//! - [`FocusSession`]: the controller
//! - [`SessionDriver`]: async event loop around the controller
//! - [`Database`]: record persistence
//! - [`Config`]: application configuration management

pub mod clock;
pub mod controller;
pub mod energy;
pub mod error;
pub mod events;
pub mod integrity;
pub mod observer;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod storage;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{Command, FocusSession, SessionPolicy};
pub use energy::{Energy, EnergyPolicy, Level, Score};
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use events::{CosmeticSlot, Event, PresenceStatus, SaveReason, StopReason};
pub use integrity::{IntegrityPolicy, IntegrityProbe, Verdict, VisibilityReconciler};
pub use observer::{SessionObserver, StatusSink, TracingObserver};
pub use runtime::{Countdown, Input, SessionDriver};
pub use session::{Mode, Phase, SessionPlan, SessionState, TimingPolicy};
pub use stats::{SessionStats, SessionSummary};
pub use storage::{Config, Database, MemoryStore, Progress, RecordStore, SessionRecord, UserId};
pub use sync::{MergeDecision, RecordSync};
