//! Saturation-weight baseline: the tray weight right after gravitational
//! drainage of a full irrigation. Replaced whole, never field by field.

use chrono::{DateTime, Local};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaturationBaseline {
    pub weight_g: f64,
    pub established_at: Option<Instant>,
    pub established_wall: Option<DateTime<Local>>,
    pub valid: bool,
}

impl Default for SaturationBaseline {
    fn default() -> Self {
        Self::unset()
    }
}

impl SaturationBaseline {
    /// No baseline yet; every VWC estimate is unavailable.
    pub const fn unset() -> Self {
        Self {
            weight_g: 0.0,
            established_at: None,
            established_wall: None,
            valid: false,
        }
    }

    pub fn established(weight_g: f64, at: Instant, wall: DateTime<Local>) -> Self {
        Self {
            weight_g,
            established_at: Some(at),
            established_wall: Some(wall),
            valid: weight_g.is_finite(),
        }
    }

    /// The weight when valid.
    #[inline]
    pub fn weight(&self) -> Option<f64> {
        self.valid.then_some(self.weight_g)
    }
}
