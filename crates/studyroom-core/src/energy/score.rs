use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Non-negative point balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(u32);

impl Score {
    pub fn new(points: u32) -> Self {
        Score(points)
    }

    pub fn points(self) -> u32 {
        self.0
    }

    pub fn award(&mut self, points: u32) {
        self.0 = self.0.saturating_add(points);
    }

    /// Subtract `points`, flooring at zero.
    pub fn penalize(&mut self, points: u32) {
        self.0 = self.0.saturating_sub(points);
    }

    /// Spend `cost` points. Leaves the balance untouched when it can't cover it.
    pub fn redeem(&mut self, cost: u32) -> Result<(), ValidationError> {
        if self.0 < cost {
            return Err(ValidationError::InsufficientPoints {
                cost,
                available: self.0,
            });
        }
        self.0 -= cost;
        Ok(())
    }

    pub fn level(self) -> Level {
        Level::from_score(self)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Progression tier derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    One,
    Two,
    Three,
    Graduate,
}

impl Level {
    pub fn from_score(score: Score) -> Self {
        match score.points() {
            p if p >= 100 => Level::Graduate,
            p if p >= 50 => Level::Three,
            p if p >= 20 => Level::Two,
            _ => Level::One,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Level::One => "1",
            Level::Two => "2",
            Level::Three => "3",
            Level::Graduate => "grad",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
