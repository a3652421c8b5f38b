//! Volumetric water content estimate from tray weight.
//!
//! vwc = saturation_vwc - (saturation_weight - avg_weight) / tray_volume * 100
//!
//! One gram of water occupies one millilitre, so a weight loss over the tray
//! volume is the drop in water fraction.

use crate::baseline::SaturationBaseline;
use crate::error::Unavailable;
use crate::settings::{TrayInputs, TrayInputsExt};

/// Estimate VWC (%) for an average tray weight.
pub fn estimate_vwc(
    avg_weight_g: f64,
    baseline: &SaturationBaseline,
    inputs: &TrayInputs,
) -> Result<f64, Unavailable> {
    let saturation_weight = baseline.weight().ok_or(Unavailable::NoBaseline)?;
    let saturation_vwc = inputs.saturation_vwc()?;
    let tray_volume = inputs.tray_volume_ml()?;
    vwc_from_parts(avg_weight_g, saturation_weight, tray_volume, saturation_vwc)
}

/// The estimator on plain numbers.
pub fn vwc_from_parts(
    avg_weight_g: f64,
    saturation_weight_g: f64,
    tray_volume_ml: f64,
    saturation_vwc: f64,
) -> Result<f64, Unavailable> {
    if tray_volume_ml == 0.0 {
        return Err(Unavailable::ZeroTrayVolume);
    }
    Ok(saturation_vwc - (saturation_weight_g - avg_weight_g) / tray_volume_ml * 100.0)
}

/// Weight loss (g) matching the configured VWC drop. Recomputed from live
/// inputs on every call.
pub fn weight_drop_threshold(inputs: &TrayInputs) -> Result<f64, Unavailable> {
    let saturation_vwc = inputs.saturation_vwc()?;
    let threshold_vwc = inputs.threshold_vwc()?;
    let tray_volume = inputs.tray_volume_ml()?;
    let threshold = (saturation_vwc - threshold_vwc) / 100.0 * tray_volume;
    if threshold <= 0.0 {
        return Err(Unavailable::NonPositiveThreshold(threshold));
    }
    Ok(threshold)
}
