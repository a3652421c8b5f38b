//! Append-only measurement log: one row per emitted long average.

use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::IrrigatorError;

/// One record of the measurement log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    pub wall: DateTime<Local>,
    pub avg_weight_g: f64,
    pub vwc: Option<f64>,
    pub relay_on: bool,
    pub saturation_weight_g: Option<f64>,
}

impl LogRow {
    /// The CSV fields: timestamp, avg (2dp), vwc (3dp) or NA, ON/OFF,
    /// saturation weight (2dp) or NA.
    pub fn fields(&self) -> [String; 5] {
        [
            self.wall.format("%Y-%m-%d %H:%M:%S").to_string(),
            format!("{:.2}", self.avg_weight_g),
            self.vwc.map_or_else(|| "NA".to_string(), |v| format!("{v:.3}")),
            if self.relay_on { "ON" } else { "OFF" }.to_string(),
            self.saturation_weight_g
                .map_or_else(|| "NA".to_string(), |w| format!("{w:.2}")),
        ]
    }
}

pub trait LogSink {
    fn write_row(&mut self, row: &LogRow) -> Result<(), IrrigatorError>;
}

/// Appends rows to a CSV file without a header. The file is opened per row,
/// so it can be rotated or removed externally while the loop runs.
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LogSink for CsvFileSink {
    fn write_row(&mut self, row: &LogRow) -> Result<(), IrrigatorError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| IrrigatorError::Io(format!("{}: {e}", self.path.display())))?;
        let mut w = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        w.write_record(row.fields())
            .map_err(|e| IrrigatorError::Io(e.to_string()))?;
        w.flush().map_err(|e| IrrigatorError::Io(e.to_string()))
    }
}

/// Collects rows in memory; clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    rows: Arc<Mutex<Vec<LogRow>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<LogRow> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn write_row(&mut self, row: &LogRow) -> Result<(), IrrigatorError> {
        self.rows
            .lock()
            .map_err(|_| IrrigatorError::Io("log buffer poisoned".into()))?
            .push(row.clone());
        Ok(())
    }
}
