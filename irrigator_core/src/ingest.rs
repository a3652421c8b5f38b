//! Line classification and per-line application to the controller.

use std::sync::{Arc, Mutex, MutexGuard};

use irrigator_traits::Relay;

use crate::controller::{IrrigationController, Tick};
use crate::error::Result;

/// One classified device line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Line {
    TareDone,
    CalDone,
    Weight(f64),
    /// Anything else: boot banners, partial lines, garbage.
    Noise,
}

/// Classify a raw line from the device. Acks are matched case-insensitively
/// anywhere in the line; everything else must be a finite decimal.
pub fn parse_line(raw: &str) -> Line {
    let line = raw.trim();
    let lower = line.to_ascii_lowercase();
    if lower.contains("tare_done") {
        return Line::TareDone;
    }
    if lower.contains("cal_done") {
        return Line::CalDone;
    }
    match line.parse::<f64>() {
        Ok(w) if w.is_finite() => Line::Weight(w),
        _ => Line::Noise,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    TareDone,
    CalDone,
    Sample(Tick),
    Dropped,
}

/// Applies lines to a shared controller, one at a time.
pub struct Ingestion<R: Relay> {
    controller: Arc<Mutex<IrrigationController<R>>>,
}

impl<R: Relay> Clone for Ingestion<R> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
        }
    }
}

impl<R: Relay> Ingestion<R> {
    pub fn new(controller: IrrigationController<R>) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
        }
    }

    pub fn controller(&self) -> Arc<Mutex<IrrigationController<R>>> {
        Arc::clone(&self.controller)
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, IrrigationController<R>>> {
        self.controller
            .lock()
            .map_err(|_| eyre::eyre!("controller lock poisoned"))
    }

    /// Parse and apply one line. The whole sample is processed under the
    /// lock before the next line is read.
    pub fn handle_line(&self, raw: &str) -> Result<LineOutcome> {
        match parse_line(raw) {
            Line::TareDone => {
                self.lock()?.on_tare_done();
                Ok(LineOutcome::TareDone)
            }
            Line::CalDone => {
                self.lock()?.on_cal_done();
                Ok(LineOutcome::CalDone)
            }
            Line::Weight(w) => Ok(LineOutcome::Sample(self.lock()?.ingest(w)?)),
            Line::Noise => {
                tracing::trace!(line = raw, "dropped unparsable line");
                Ok(LineOutcome::Dropped)
            }
        }
    }
}
