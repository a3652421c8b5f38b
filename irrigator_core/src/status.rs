//! Controller mode, operator status line, and the snapshot handed to display
//! consumers.

use std::fmt;

use crate::error::Unavailable;

/// Public state of the irrigation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerMode {
    Idle,
    Irrigating,
    Draining,
    Recalibrating,
}

impl fmt::Display for ControllerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Irrigating => "irrigating",
            Self::Draining => "draining",
            Self::Recalibrating => "recalibrating",
        })
    }
}

/// Most recent operator-facing status message.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Ready,
    TareInProgress,
    TareComplete,
    CalibrationInProgress,
    CalibrationComplete,
    ManualRunStarted,
    Draining,
    CollectingSaturation,
    SaturationEstablished(f64),
    /// Recalibration window elapsed without enough samples.
    InsufficientData { got: usize, need: usize },
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("ready"),
            Self::TareInProgress => f.write_str("tare in progress"),
            Self::TareComplete => f.write_str("tare complete"),
            Self::CalibrationInProgress => f.write_str("calibration in progress"),
            Self::CalibrationComplete => f.write_str("calibration complete"),
            Self::ManualRunStarted => f.write_str("manual irrigation started"),
            Self::Draining => f.write_str("draining"),
            Self::CollectingSaturation => f.write_str("collecting saturation weight"),
            Self::SaturationEstablished(w) => write!(f, "saturation weight {w:.2} g"),
            Self::InsufficientData { got, need } => {
                write!(f, "insufficient data: {got} of {need} samples")
            }
        }
    }
}

/// Point-in-time view of the engine for displays.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSnapshot {
    pub mode: ControllerMode,
    pub status: Status,
    pub relay_on: bool,
    pub allow_relay: bool,
    pub manual_active: bool,
    pub latest_weight_g: Option<f64>,
    pub short_avg_g: Option<f64>,
    pub long_avg_g: Option<f64>,
    pub vwc: Option<f64>,
    pub saturation_weight_g: Option<f64>,
    pub weight_drop_threshold_g: Result<f64, Unavailable>,
    pub events: usize,
}

impl fmt::Display for ControllerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt(v: Option<f64>, prec: usize) -> String {
            v.map_or_else(|| "NA".to_string(), |v| format!("{v:.prec$}"))
        }
        write!(
            f,
            "{} | {} | relay {} | short {} g | long {} g | vwc {} | saturation {} g | drop threshold {}",
            self.mode,
            self.status,
            if self.relay_on { "ON" } else { "OFF" },
            opt(self.short_avg_g, 2),
            opt(self.long_avg_g, 2),
            opt(self.vwc, 3),
            opt(self.saturation_weight_g, 2),
            match &self.weight_drop_threshold_g {
                Ok(t) => format!("{t:.2} g"),
                Err(e) => format!("NA ({e})"),
            }
        )
    }
}
