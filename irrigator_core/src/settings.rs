//! Live tray settings.
//!
//! Values are kept as the operator typed them and parsed at every decision,
//! so an edit takes effect on the next evaluated average and a typo only
//! makes the dependent value unavailable.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

pub use irrigator_config::TrayInputs;

use crate::error::Unavailable;

/// Parse one text field as a finite number.
pub fn parse_field(field: &'static str, value: &str) -> Result<f64, Unavailable> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(Unavailable::NotANumber {
            field,
            value: value.to_string(),
        }),
    }
}

/// Typed accessors over the text fields.
pub trait TrayInputsExt {
    fn saturation_vwc(&self) -> Result<f64, Unavailable>;
    fn threshold_vwc(&self) -> Result<f64, Unavailable>;
    fn tray_volume_ml(&self) -> Result<f64, Unavailable>;
    /// Pump pulse length; must be strictly positive.
    fn relay_duration(&self) -> Result<Duration, Unavailable>;
}

impl TrayInputsExt for TrayInputs {
    fn saturation_vwc(&self) -> Result<f64, Unavailable> {
        parse_field("saturation_vwc", &self.saturation_vwc)
    }

    fn threshold_vwc(&self) -> Result<f64, Unavailable> {
        parse_field("threshold_vwc", &self.threshold_vwc)
    }

    fn tray_volume_ml(&self) -> Result<f64, Unavailable> {
        parse_field("tray_volume_ml", &self.tray_volume_ml)
    }

    fn relay_duration(&self) -> Result<Duration, Unavailable> {
        let secs = parse_field("relay_duration_s", &self.relay_duration_s)?;
        if secs <= 0.0 {
            return Err(Unavailable::NonPositiveDuration);
        }
        Duration::try_from_secs_f64(secs).map_err(|_| Unavailable::NotANumber {
            field: "relay_duration_s",
            value: self.relay_duration_s.clone(),
        })
    }
}

/// Source of the current tray inputs, consulted on every decision.
pub trait SettingsSource {
    fn current(&self) -> TrayInputs;
}

impl<S: SettingsSource + ?Sized> SettingsSource for Box<S> {
    fn current(&self) -> TrayInputs {
        (**self).current()
    }
}

/// Fixed inputs (tests, one-shot commands).
#[derive(Debug, Clone)]
pub struct StaticSettings(pub TrayInputs);

impl SettingsSource for StaticSettings {
    fn current(&self) -> TrayInputs {
        self.0.clone()
    }
}

/// Inputs backed by a TOML file the operator edits while the loop runs.
///
/// The file is re-read only when its modification time changes. If it cannot
/// be read or parsed, the last good values (initially `fallback`) are kept.
pub struct TrayFileSettings {
    path: PathBuf,
    cache: Mutex<(Option<SystemTime>, TrayInputs)>,
}

impl TrayFileSettings {
    pub fn new(path: impl Into<PathBuf>, fallback: TrayInputs) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new((None, fallback)),
        }
    }
}

impl SettingsSource for TrayFileSettings {
    fn current(&self) -> TrayInputs {
        let Ok(mut cache) = self.cache.lock() else {
            return TrayInputs::default();
        };
        let modified = std::fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        if modified.is_some() && modified != cache.0 {
            match irrigator_config::load_tray_file(&self.path) {
                Ok(inputs) => {
                    tracing::info!(path = %self.path.display(), ?inputs, "tray settings reloaded");
                    *cache = (modified, inputs);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "tray settings reload failed; keeping previous values");
                    cache.0 = modified;
                }
            }
        }
        cache.1.clone()
    }
}
