//! Simulated tray: a loadcell board that answers `tare`/`cal` and reports a
//! weight that dries slowly and rises while the paired pump relay is on.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use irrigator_traits::{Relay, Transport};

use crate::error::HwError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct TrayModel {
    pub start_weight_g: f64,
    pub dry_rate_g_per_s: f64,
    pub pump_rate_g_per_s: f64,
    /// Time between reported samples.
    pub period: Duration,
}

impl Default for TrayModel {
    fn default() -> Self {
        Self {
            start_weight_g: 1000.0,
            dry_rate_g_per_s: 0.05,
            pump_rate_g_per_s: 5.0,
            period: Duration::from_secs(1),
        }
    }
}

pub struct SimulatedTray {
    model: TrayModel,
    weight_g: f64,
    pump: Arc<AtomicBool>,
    acks: VecDeque<&'static str>,
}

impl SimulatedTray {
    pub fn new(model: TrayModel) -> Self {
        Self {
            weight_g: model.start_weight_g,
            model,
            pump: Arc::new(AtomicBool::new(false)),
            acks: VecDeque::new(),
        }
    }

    /// A relay wired to this tray's pump.
    pub fn relay(&self) -> SimulatedRelay {
        SimulatedRelay {
            energized: Arc::clone(&self.pump),
        }
    }

    pub fn weight_g(&self) -> f64 {
        self.weight_g
    }

    fn advance(&mut self, dt: Duration) {
        let rate = if self.pump.load(Ordering::Relaxed) {
            self.model.pump_rate_g_per_s
        } else {
            -self.model.dry_rate_g_per_s
        };
        self.weight_g = (self.weight_g + rate * dt.as_secs_f64()).max(0.0);
    }
}

impl Transport for SimulatedTray {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, BoxError> {
        if let Some(ack) = self.acks.pop_front() {
            return Ok(Some(ack.to_string()));
        }
        if self.model.period > timeout {
            std::thread::sleep(timeout);
            return Ok(None);
        }
        std::thread::sleep(self.model.period);
        self.advance(self.model.period);
        Ok(Some(format!("{:.2}", self.weight_g)))
    }

    fn write_line(&mut self, line: &str) -> Result<(), BoxError> {
        match line.trim() {
            "tare" => self.acks.push_back("tare_done"),
            "cal" => self.acks.push_back("cal_done"),
            other => return Err(Box::new(HwError::UnknownCommand(other.to_string()))),
        }
        tracing::debug!(command = line, "simulated board acknowledged");
        Ok(())
    }
}

/// Relay for the simulated pump. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SimulatedRelay {
    energized: Arc<AtomicBool>,
}

impl SimulatedRelay {
    pub fn is_on(&self) -> bool {
        self.energized.load(Ordering::Relaxed)
    }
}

impl Relay for SimulatedRelay {
    fn on(&mut self) -> Result<(), BoxError> {
        self.energized.store(true, Ordering::Relaxed);
        tracing::debug!("simulated pump on");
        Ok(())
    }

    fn off(&mut self) -> Result<(), BoxError> {
        self.energized.store(false, Ordering::Relaxed);
        tracing::debug!("simulated pump off");
        Ok(())
    }
}
