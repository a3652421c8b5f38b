//! The irrigation state machine.
//!
//! One controller owns the sample window, the saturation baseline, the
//! AllowRelay interlock and the logical relay state. Ingestion calls
//! [`IrrigationController::ingest`] once per valid sample; a manual run is
//! advanced by [`IrrigationController::poll_manual`] from its own thread.
//! Both paths go through the same `Mutex`, so ticks never interleave.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use irrigator_traits::{Clock, Relay};

use crate::baseline::SaturationBaseline;
use crate::error::{IrrigatorError, Result, Unavailable};
use crate::events::{EventLog, IrrigationEvent, RelayEventKind, VwcHistory, VwcPoint};
use crate::hw_error::{Seam, map_hw_error};
use crate::logger::{LogRow, LogSink};
use crate::recalibration::{Phase, Recalibration, Step};
use crate::settings::{SettingsSource, TrayInputs, TrayInputsExt};
use crate::status::{ControllerMode, ControllerSnapshot, Status};
use crate::vwc::{estimate_vwc, weight_drop_threshold};
use crate::window::{Sample, SampleWindow};

pub type SharedClock = Arc<dyn Clock + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Idle,
    /// `pulse_at_on` is used if the live duration stops parsing mid-pulse.
    Irrigating {
        on_since: Instant,
        pulse_at_on: Duration,
    },
    /// Automatic drain and re-baseline after an irrigation pulse.
    Recovering(Recalibration),
    /// Operator-started run (pulse, drain, collect).
    Manual(Recalibration),
}

/// Observable effect of a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    RelayOn,
    RelayOff,
    CollectionStarted,
    BaselineEstablished(f64),
    RecalibrationFailed { got: usize, need: usize },
}

/// What one ingested sample produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tick {
    pub accepted: bool,
    pub short_avg: Option<f64>,
    pub long_avg: Option<f64>,
    /// Present only when a long average was emitted this tick.
    pub vwc: Option<std::result::Result<f64, Unavailable>>,
    pub transitions: Vec<Transition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualPoll {
    Running,
    Finished,
}

pub struct IrrigationController<R: Relay> {
    relay: R,
    clock: SharedClock,
    settings: Box<dyn SettingsSource + Send>,
    sink: Option<Box<dyn LogSink + Send>>,
    window: SampleWindow,
    baseline: SaturationBaseline,
    allow_relay: bool,
    relay_on: bool,
    on_since: Option<Instant>,
    mode: Mode,
    events: EventLog,
    history: VwcHistory,
    status: Status,
    last_short: Option<f64>,
    last_long: Option<f64>,
    last_vwc: Option<f64>,
}

impl<R: Relay> core::fmt::Debug for IrrigationController<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IrrigationController")
            .field("mode", &self.mode())
            .field("relay_on", &self.relay_on)
            .field("allow_relay", &self.allow_relay)
            .field("baseline", &self.baseline.weight())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<R: Relay> IrrigationController<R> {
    pub(crate) fn new(
        relay: R,
        clock: SharedClock,
        settings: Box<dyn SettingsSource + Send>,
        sink: Option<Box<dyn LogSink + Send>>,
    ) -> Self {
        Self {
            relay,
            clock,
            settings,
            sink,
            window: SampleWindow::new(),
            baseline: SaturationBaseline::unset(),
            allow_relay: false,
            relay_on: false,
            on_since: None,
            mode: Mode::Idle,
            events: EventLog::new(),
            history: VwcHistory::default(),
            status: Status::Ready,
            last_short: None,
            last_long: None,
            last_vwc: None,
        }
    }

    /// Process one valid weight sample: window update, average emission,
    /// VWC, state transition, then the log row.
    pub fn ingest(&mut self, weight_g: f64) -> Result<Tick> {
        let now = self.clock.now();
        let wall = self.clock.wall_now();
        let inputs = self.settings.current();

        let mut tick = Tick {
            accepted: self.window.push(Sample { at: now, weight_g }),
            ..Tick::default()
        };
        if !tick.accepted {
            tracing::trace!(weight_g, "sample before calibration complete; not buffered");
        }

        tick.short_avg = self.window.try_emit_short(now);
        if let Some(avg) = tick.short_avg {
            self.last_short = Some(avg);
            tracing::debug!(avg_g = avg, "short average");
        }
        tick.long_avg = self.window.try_emit_long(now);
        if let Some(avg) = tick.long_avg {
            self.last_long = Some(avg);
            let vwc = estimate_vwc(avg, &self.baseline, &inputs);
            match &vwc {
                Ok(v) => {
                    self.last_vwc = Some(*v);
                    self.history.record(VwcPoint { at: now, wall, vwc: *v });
                }
                Err(reason) => {
                    self.last_vwc = None;
                    tracing::debug!(%reason, "vwc unavailable");
                }
            }
            tracing::info!(
                avg_g = avg,
                vwc = ?vwc.as_ref().ok(),
                relay_on = self.relay_on,
                "long average"
            );
            tick.vwc = Some(vwc);
        }

        let stepped = self.step(now, wall, tick.long_avg, &inputs, &mut tick.transitions);

        if let Some(avg) = tick.long_avg {
            self.write_log_row(LogRow {
                wall,
                avg_weight_g: avg,
                vwc: tick.vwc.as_ref().and_then(|v| v.as_ref().ok().copied()),
                relay_on: self.relay_on,
                saturation_weight_g: self.baseline.weight(),
            });
        }

        stepped.map_err(eyre::Report::new)?;
        Ok(tick)
    }

    fn step(
        &mut self,
        now: Instant,
        wall: DateTime<Local>,
        long_avg: Option<f64>,
        inputs: &TrayInputs,
        out: &mut Vec<Transition>,
    ) -> std::result::Result<(), IrrigatorError> {
        match self.mode {
            Mode::Idle => {
                let Some(avg) = long_avg else {
                    return Ok(());
                };
                let Some(pulse) = self.irrigation_due(avg, inputs) else {
                    return Ok(());
                };
                self.switch_relay(true, now, wall)?;
                self.mode = Mode::Irrigating {
                    on_since: now,
                    pulse_at_on: pulse,
                };
                out.push(Transition::RelayOn);
            }
            Mode::Irrigating {
                on_since,
                pulse_at_on,
            } => {
                let pulse = inputs.relay_duration().unwrap_or(pulse_at_on);
                if now.saturating_duration_since(on_since) >= pulse {
                    self.switch_relay(false, now, wall)?;
                    self.allow_relay = false;
                    self.mode = Mode::Recovering(Recalibration::automatic(now));
                    self.status = Status::Draining;
                    out.push(Transition::RelayOff);
                }
            }
            Mode::Recovering(mut recal) => {
                let step = recal.advance(now, &self.window);
                self.mode = Mode::Recovering(recal);
                self.apply_collection_step(step, now, wall, out);
            }
            Mode::Manual(_) => {}
        }
        Ok(())
    }

    /// Pulse length if the ON guard holds for this long average.
    fn irrigation_due(&self, avg: f64, inputs: &TrayInputs) -> Option<Duration> {
        if !self.allow_relay || avg <= 0.0 {
            return None;
        }
        let saturation = self.baseline.weight()?;
        let threshold = match weight_drop_threshold(inputs) {
            Ok(t) => t,
            Err(reason) => {
                tracing::debug!(%reason, "weight-drop threshold unavailable");
                return None;
            }
        };
        let pulse = match inputs.relay_duration() {
            Ok(p) => p,
            Err(reason) => {
                tracing::debug!(%reason, "relay duration unavailable");
                return None;
            }
        };
        (saturation - avg >= threshold).then_some(pulse)
    }

    fn apply_collection_step(
        &mut self,
        step: Step,
        now: Instant,
        wall: DateTime<Local>,
        out: &mut Vec<Transition>,
    ) {
        match step {
            Step::Waiting | Step::PulseElapsed => {}
            Step::CollectionStarted => {
                tracing::info!("drain complete; collecting saturation weight");
                self.status = Status::CollectingSaturation;
                out.push(Transition::CollectionStarted);
            }
            Step::Completed { weight_g, samples } => {
                self.baseline = SaturationBaseline::established(weight_g, now, wall);
                self.allow_relay = self.baseline.valid;
                self.mode = Mode::Idle;
                self.status = Status::SaturationEstablished(weight_g);
                tracing::info!(weight_g, samples, "saturation weight established");
                out.push(Transition::BaselineEstablished(weight_g));
            }
            Step::Failed { got, need } => {
                self.allow_relay = false;
                if matches!(self.mode, Mode::Manual(recal) if recal.is_finished()) {
                    self.mode = Mode::Idle;
                }
                self.status = Status::InsufficientData { got, need };
                tracing::warn!(got, need, "not enough samples for saturation weight");
                out.push(Transition::RecalibrationFailed { got, need });
            }
        }
    }

    fn switch_relay(
        &mut self,
        on: bool,
        now: Instant,
        wall: DateTime<Local>,
    ) -> std::result::Result<(), IrrigatorError> {
        let res = if on { self.relay.on() } else { self.relay.off() };
        res.map_err(|e| map_hw_error(&*e, Seam::Relay))?;
        self.relay_on = on;
        self.on_since = on.then_some(now);
        let kind = if on {
            RelayEventKind::On
        } else {
            RelayEventKind::Off
        };
        self.events.append(IrrigationEvent { at: now, wall, kind });
        tracing::info!(relay = %kind, "relay switched");
        Ok(())
    }

    fn write_log_row(&mut self, row: LogRow) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.write_row(&row) {
                tracing::warn!(error = %e, "log row not written");
            }
        }
    }

    /// Begin an operator irrigation run followed by a saturation-weight
    /// measurement. Drive it with [`Self::poll_manual`].
    pub fn start_manual(&mut self) -> std::result::Result<(), IrrigatorError> {
        if self.manual_active() {
            return Err(IrrigatorError::Busy("a manual run is already active"));
        }
        if self.mode != Mode::Idle {
            return Err(IrrigatorError::Busy("controller is not idle"));
        }
        if self.relay_on {
            return Err(IrrigatorError::Busy("relay is already on"));
        }
        let pulse = self
            .settings
            .current()
            .relay_duration()
            .map_err(|e| IrrigatorError::Config(e.to_string()))?;
        let now = self.clock.now();
        let wall = self.clock.wall_now();
        self.allow_relay = false;
        self.switch_relay(true, now, wall)?;
        self.mode = Mode::Manual(Recalibration::manual(now, pulse));
        self.status = Status::ManualRunStarted;
        tracing::info!(pulse_s = pulse.as_secs_f64(), "manual run started");
        Ok(())
    }

    /// Advance the manual run on the scheduler tick.
    pub fn poll_manual(&mut self) -> ManualPoll {
        let Mode::Manual(mut recal) = self.mode else {
            return ManualPoll::Finished;
        };
        let now = self.clock.now();
        let wall = self.clock.wall_now();
        let before = recal;
        let step = recal.advance(now, &self.window);
        self.mode = Mode::Manual(recal);
        match step {
            Step::PulseElapsed => match self.switch_relay(false, now, wall) {
                Ok(()) => {
                    self.status = Status::Draining;
                    tracing::info!("manual pulse complete; draining");
                }
                Err(e) => {
                    // stay in the pulse phase so the next tick retries OFF
                    tracing::error!(error = %e, "relay OFF failed");
                    self.mode = Mode::Manual(before);
                }
            },
            other => {
                let mut transitions = Vec::new();
                self.apply_collection_step(other, now, wall, &mut transitions);
            }
        }
        if self.manual_active() {
            ManualPoll::Running
        } else {
            ManualPoll::Finished
        }
    }

    /// Called when the device acknowledges calibration: (re)arm the windows.
    pub fn on_cal_done(&mut self) {
        self.window.arm(self.clock.now());
        self.status = Status::CalibrationComplete;
        tracing::info!("calibration complete; sampling windows armed");
    }

    pub fn on_tare_done(&mut self) {
        self.status = Status::TareComplete;
        tracing::info!("tare complete");
    }

    pub fn note_tare_sent(&mut self) {
        self.status = Status::TareInProgress;
    }

    pub fn note_cal_sent(&mut self) {
        self.status = Status::CalibrationInProgress;
    }

    /// Command the relay OFF regardless of the logical state. Used on exit.
    pub fn shutdown(&mut self) {
        let now = self.clock.now();
        let wall = self.clock.wall_now();
        let was_on = self.relay_on;
        match self.relay.off() {
            Ok(()) => {
                self.relay_on = false;
                self.on_since = None;
                if was_on {
                    self.events.append(IrrigationEvent {
                        at: now,
                        wall,
                        kind: RelayEventKind::Off,
                    });
                }
            }
            Err(e) => {
                tracing::error!(error = %map_hw_error(&*e, Seam::Relay), "relay OFF on shutdown failed");
            }
        }
    }

    pub fn mode(&self) -> ControllerMode {
        match self.mode {
            Mode::Idle => ControllerMode::Idle,
            Mode::Irrigating { .. } => ControllerMode::Irrigating,
            Mode::Recovering(r) | Mode::Manual(r) => match r.phase() {
                Phase::Pulse { .. } => ControllerMode::Irrigating,
                Phase::Drain { .. } => ControllerMode::Draining,
                Phase::Collect { .. } => ControllerMode::Recalibrating,
                Phase::Finished => ControllerMode::Idle,
            },
        }
    }

    pub fn manual_active(&self) -> bool {
        matches!(self.mode, Mode::Manual(r) if !r.is_finished())
    }

    pub fn relay_on(&self) -> bool {
        self.relay_on
    }

    pub fn relay_on_since(&self) -> Option<Instant> {
        self.on_since
    }

    pub fn allow_relay(&self) -> bool {
        self.allow_relay
    }

    pub fn baseline(&self) -> &SaturationBaseline {
        &self.baseline
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn vwc_history(&self) -> &VwcHistory {
        &self.history
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn clock(&self) -> SharedClock {
        Arc::clone(&self.clock)
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    pub fn relay_mut(&mut self) -> &mut R {
        &mut self.relay
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            mode: self.mode(),
            status: self.status.clone(),
            relay_on: self.relay_on,
            allow_relay: self.allow_relay,
            manual_active: self.manual_active(),
            latest_weight_g: self.window.latest().map(|s| s.weight_g),
            short_avg_g: self.last_short,
            long_avg_g: self.last_long,
            vwc: self.last_vwc,
            saturation_weight_g: self.baseline.weight(),
            weight_drop_threshold_g: weight_drop_threshold(&self.settings.current()),
            events: self.events.len(),
        }
    }
}
