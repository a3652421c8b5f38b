#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the tray irrigator.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `TrayInputs` keeps the operator-entered tray values as text; they are
//!   parsed by the core on every decision, so a bad value degrades a single
//!   derived quantity instead of rejecting the whole file.
//! - `load_tray_file` reads a standalone tray table for live editing.
use serde::Deserialize;
use serde::de::Deserializer;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SerialCfg {
    /// Device path of the loadcell controller (e.g. "/dev/ttyACM0").
    pub port: String,
    pub baud_rate: u32,
    /// Blocking read timeout for one line (ms). Expiry means "no sample".
    pub read_timeout_ms: u64,
    /// Pause after a transport fault before retrying (ms).
    pub retry_pause_ms: u64,
}

impl Default for SerialCfg {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            read_timeout_ms: 2000,
            retry_pause_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RelayCfg {
    /// BCM GPIO pin driving the pump relay.
    pub pin: u8,
    /// Drive the pin high to energize the relay.
    pub active_high: bool,
}

impl Default for RelayCfg {
    fn default() -> Self {
        Self {
            pin: 18,
            active_high: true,
        }
    }
}

/// Operator-entered tray values, kept verbatim.
///
/// Each field accepts a TOML number or string. Strings are not checked here:
/// "abc" is a legal value that makes the dependent computation unavailable.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct TrayInputs {
    /// VWC (%) of the substrate at saturation.
    #[serde(deserialize_with = "de_text")]
    pub saturation_vwc: String,
    /// VWC (%) at which irrigation starts.
    #[serde(deserialize_with = "de_text")]
    pub threshold_vwc: String,
    /// Substrate volume of the tray (mL).
    #[serde(deserialize_with = "de_text")]
    pub tray_volume_ml: String,
    /// Pump pulse length (s).
    #[serde(deserialize_with = "de_text")]
    pub relay_duration_s: String,
}

impl TrayInputs {
    pub fn new(
        saturation_vwc: impl Into<String>,
        threshold_vwc: impl Into<String>,
        tray_volume_ml: impl Into<String>,
        relay_duration_s: impl Into<String>,
    ) -> Self {
        Self {
            saturation_vwc: saturation_vwc.into(),
            threshold_vwc: threshold_vwc.into(),
            tray_volume_ml: tray_volume_ml.into(),
            relay_duration_s: relay_duration_s.into(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct TrayCfg {
    #[serde(flatten)]
    pub inputs: TrayInputs,
    /// Optional standalone TOML file holding the same keys. When set, it is
    /// re-read whenever it changes and takes precedence over the inline values.
    pub tray_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogCfg {
    /// Append-only CSV file receiving one row per long-window average.
    pub csv_file: PathBuf,
}

impl Default for LogCfg {
    fn default() -> Self {
        Self {
            csv_file: PathBuf::from("weight_log.csv"),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationCfg {
    /// Interval between simulated weight lines (ms).
    pub period_ms: u64,
    /// Tray weight at startup (g).
    pub start_weight_g: f64,
    /// Evapotranspiration loss while the pump is off (g/s).
    pub dry_rate_g_per_s: f64,
    /// Weight gain while the pump runs (g/s).
    pub pump_rate_g_per_s: f64,
}

impl Default for SimulationCfg {
    fn default() -> Self {
        Self {
            period_ms: 1000,
            start_weight_g: 1000.0,
            dry_rate_g_per_s: 0.05,
            pump_rate_g_per_s: 5.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialCfg,
    #[serde(default)]
    pub relay: RelayCfg,
    #[serde(default)]
    pub tray: TrayCfg,
    #[serde(default)]
    pub log: LogCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub simulation: SimulationCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read a standalone tray table (the keys of `[tray]` at top level).
pub fn load_tray_file(path: &Path) -> eyre::Result<TrayInputs> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read tray file {:?}: {}", path, e))?;
    toml::from_str::<TrayInputs>(&text).map_err(|e| eyre::eyre!("parse tray file {:?}: {}", path, e))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextToml {
    Text(String),
    Int(i64),
    Float(f64),
}

fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match TextToml::deserialize(deserializer)? {
        TextToml::Text(s) => s,
        TextToml::Int(i) => i.to_string(),
        TextToml::Float(f) => f.to_string(),
    })
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Serial
        if self.serial.port.trim().is_empty() {
            eyre::bail!("serial.port must not be empty");
        }
        if self.serial.baud_rate == 0 {
            eyre::bail!("serial.baud_rate must be > 0");
        }
        if self.serial.read_timeout_ms == 0 {
            eyre::bail!("serial.read_timeout_ms must be >= 1");
        }
        if self.serial.read_timeout_ms > 60_000 {
            eyre::bail!("serial.read_timeout_ms is unreasonably large (>60s)");
        }
        if self.serial.retry_pause_ms > 60_000 {
            eyre::bail!("serial.retry_pause_ms is unreasonably large (>60s)");
        }

        // Log sink
        if self.log.csv_file.as_os_str().is_empty() {
            eyre::bail!("log.csv_file must not be empty");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Simulation
        if self.simulation.period_ms == 0 {
            eyre::bail!("simulation.period_ms must be >= 1");
        }
        if !self.simulation.start_weight_g.is_finite() || self.simulation.start_weight_g < 0.0 {
            eyre::bail!("simulation.start_weight_g must be a finite value >= 0");
        }
        if !(self.simulation.dry_rate_g_per_s.is_finite()
            && self.simulation.dry_rate_g_per_s >= 0.0)
        {
            eyre::bail!("simulation.dry_rate_g_per_s must be >= 0");
        }
        if !(self.simulation.pump_rate_g_per_s.is_finite()
            && self.simulation.pump_rate_g_per_s >= 0.0)
        {
            eyre::bail!("simulation.pump_rate_g_per_s must be >= 0");
        }

        // Tray values are validated live by the core; nothing to check here.
        Ok(())
    }
}
