use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IrrigatorError {
    #[error("relay error: {0}")]
    Relay(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for transport")]
    Timeout,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("controller busy: {0}")]
    Busy(&'static str),
    #[error("insufficient data for saturation weight: got {got} samples, need {need}")]
    InsufficientData { got: usize, need: usize },
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing relay")]
    MissingRelay,
    #[error("missing tray settings")]
    MissingSettings,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Why a derived value (VWC, weight-drop threshold, pulse length) could not be
/// computed this tick. Rendered as "NA" in log rows; never treated as zero.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Unavailable {
    #[error("no valid saturation weight")]
    NoBaseline,
    #[error("{field} is not a number: {value:?}")]
    NotANumber { field: &'static str, value: String },
    #[error("tray volume is zero")]
    ZeroTrayVolume,
    #[error("saturation VWC must exceed threshold VWC (drop threshold {0:.2} g)")]
    NonPositiveThreshold(f64),
    #[error("relay duration must be > 0 s")]
    NonPositiveDuration,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
