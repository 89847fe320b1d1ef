//! Period state machine.
//!
//! ```text
//! Idle -> Work(1) -> Break(1) -> Work(2) -> ... -> Work(N) -> Finished
//!            \                      \
//!             +-> Failed(n) -- restart --> Work(n)
//! ```
//!
//! `Failed` and `Finished` are absorbing: only a restart (from `Failed`) or a
//! new duration selection leaves them.

mod machine;
mod state;

pub use state::{Mode, Phase, SessionPlan, SessionState, TimingPolicy};
