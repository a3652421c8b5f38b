//! Maps `Box<dyn Error>` from trait boundaries to typed `IrrigatorError`.
//!
//! The traits in `irrigator_traits` use `Box<dyn Error + Send + Sync>` for
//! maximum flexibility; this module converts those to our typed error enum,
//! with an optional feature-gated path for `irrigator_hardware::HwError`
//! downcasting.

use crate::error::IrrigatorError;

/// Which seam the error came through; selects the fallback variant.
#[derive(Debug, Clone, Copy)]
pub enum Seam {
    Transport,
    Relay,
}

/// Map a trait-boundary error to a typed `IrrigatorError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static), seam: Seam) -> IrrigatorError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<irrigator_hardware::error::HwError>() {
            return match hw {
                irrigator_hardware::error::HwError::Timeout => IrrigatorError::Timeout,
                other => IrrigatorError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timed out") || s.to_lowercase().contains("timeout") {
        return IrrigatorError::Timeout;
    }
    match seam {
        Seam::Transport => IrrigatorError::Transport(s),
        Seam::Relay => IrrigatorError::Relay(s),
    }
}
