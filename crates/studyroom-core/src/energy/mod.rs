//! Energy and scoring model.
//!
//! Energy is a bounded focus resource in `[0, 100]`. Every mutation goes
//! through [`Energy`], which clamps, so no caller can push it out of range.
//! The rates come from [`EnergyPolicy`]; the functions here are pure.

mod score;

pub use score::{Level, Score};

use serde::{Deserialize, Serialize};

/// Upper bound for energy.
pub const MAX_ENERGY: f64 = 100.0;

/// Bounded energy value.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Energy(f64);

impl Energy {
    pub const FULL: Energy = Energy(MAX_ENERGY);
    pub const EMPTY: Energy = Energy(0.0);

    /// Build an energy value, clamping into `[0, 100]`. NaN becomes empty.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::EMPTY;
        }
        Energy(value.clamp(0.0, MAX_ENERGY))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Snapshot recorded in the period history.
    pub fn floor(self) -> u32 {
        self.0.floor() as u32
    }

    pub fn is_depleted(self) -> bool {
        self.0 <= 0.0
    }

    pub fn gain(self, amount: f64) -> Self {
        Energy::new(self.0 + amount)
    }

    pub fn drain(self, amount: f64) -> Self {
        Energy::new(self.0 - amount)
    }
}

impl Default for Energy {
    fn default() -> Self {
        Self::FULL
    }
}

/// Rates and thresholds for energy and score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyPolicy {
    /// Energy regained per visible Work second.
    pub tick_regen: f64,
    /// Energy regained per second of legitimate screen-off focus.
    pub offline_regen: f64,
    /// Energy lost per hidden second once flagged as a suspected cheat.
    pub cheat_penalty_rate: f64,
    /// A Work period passes only when energy ends strictly above this.
    pub pass_threshold: f64,
    /// Points awarded for a passed Work period.
    pub period_bonus: u32,
    /// Points removed when energy runs out.
    pub depletion_penalty: u32,
}

impl Default for EnergyPolicy {
    fn default() -> Self {
        Self {
            tick_regen: 0.3,
            offline_regen: 0.1,
            cheat_penalty_rate: 5.0,
            pass_threshold: 50.0,
            period_bonus: 10,
            depletion_penalty: 5,
        }
    }
}

impl EnergyPolicy {
    /// Energy after one visible Work tick.
    pub fn after_tick(&self, energy: Energy) -> Energy {
        energy.gain(self.tick_regen)
    }

    /// Energy after `elapsed_secs` of legitimate offline focus.
    pub fn after_offline_focus(&self, energy: Energy, elapsed_secs: u64) -> Energy {
        energy.gain(elapsed_secs as f64 * self.offline_regen)
    }

    /// Energy after a suspected cheat spanning `elapsed_secs`.
    pub fn after_cheat(&self, energy: Energy, elapsed_secs: u64) -> Energy {
        energy.drain(self.cheat_penalty(elapsed_secs))
    }

    /// Raw penalty amount for a suspected cheat.
    pub fn cheat_penalty(&self, elapsed_secs: u64) -> f64 {
        elapsed_secs as f64 * self.cheat_penalty_rate
    }

    /// Whether a Work period ending at `energy` earns the completion bonus.
    pub fn period_passed(&self, energy: Energy) -> bool {
        energy.value() > self.pass_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn energy_clamps_on_construction() {
        assert_eq!(Energy::new(150.0), Energy::FULL);
        assert_eq!(Energy::new(-3.0), Energy::EMPTY);
        assert_eq!(Energy::new(f64::NAN), Energy::EMPTY);
        assert_eq!(Energy::new(42.5).value(), 42.5);
    }

    #[test]
    fn tick_regen_caps_at_full() {
        let policy = EnergyPolicy::default();
        assert_eq!(policy.after_tick(Energy::new(99.9)), Energy::FULL);
        let e = policy.after_tick(Energy::new(10.0));
        assert!((e.value() - 10.3).abs() < 1e-9);
    }

    #[test]
    fn cheat_penalty_is_five_per_second() {
        let policy = EnergyPolicy::default();
        assert_eq!(policy.after_cheat(Energy::FULL, 10).value(), 50.0);
        assert_eq!(policy.after_cheat(Energy::FULL, 30), Energy::EMPTY);
    }

    #[test]
    fn pass_threshold_is_strict() {
        let policy = EnergyPolicy::default();
        assert!(!policy.period_passed(Energy::new(50.0)));
        assert!(policy.period_passed(Energy::new(50.01)));
    }

    #[test]
    fn floor_snapshot() {
        assert_eq!(Energy::new(73.99).floor(), 73);
        assert_eq!(Energy::FULL.floor(), 100);
    }

    proptest! {
        #[test]
        fn energy_never_leaves_bounds(
            start in 0.0f64..=100.0,
            ops in prop::collection::vec((0u8..3, 0u64..10_000), 0..50),
        ) {
            let policy = EnergyPolicy::default();
            let mut energy = Energy::new(start);
            for (kind, secs) in ops {
                energy = match kind {
                    0 => policy.after_tick(energy),
                    1 => policy.after_offline_focus(energy, secs),
                    _ => policy.after_cheat(energy, secs),
                };
                prop_assert!((0.0..=MAX_ENERGY).contains(&energy.value()));
            }
        }
    }
}
