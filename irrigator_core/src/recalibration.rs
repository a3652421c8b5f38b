//! Saturation-weight recalibration as an explicit phase machine.
//!
//! Manual: `Pulse` -> `Drain` -> `Collect` -> finished.
//! Automatic (after an irrigation pulse): `Drain` -> `Collect` -> finished.
//! A shortfall at the end of the automatic window is reported once; the
//! collection then stays open and completes on the first tick that has
//! `COLLECT_MAX` samples since the drain ended.
//!
//! Every phase stores its monotonic deadline; `advance` is called from a
//! scheduler tick and never blocks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use irrigator_traits::{Clock, Relay};

use crate::controller::{IrrigationController, ManualPoll};
use crate::window::{LONG_N, SampleWindow};

/// Gravitational drainage time before the tray weight settles.
pub const DRAIN_WAIT: Duration = Duration::from_secs(600);
/// Length of the post-drain sampling window.
pub const COLLECT_WINDOW: Duration = Duration::from_secs(60);
/// Upper bound on samples averaged into a baseline.
pub const COLLECT_MAX: usize = LONG_N;
/// Scheduler tick of the manual recalibration thread.
pub const MANUAL_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecalKind {
    Manual,
    Automatic,
}

impl RecalKind {
    /// Fewest collected samples that still yield a baseline.
    pub fn min_samples(self) -> usize {
        match self {
            Self::Manual => 1,
            Self::Automatic => COLLECT_MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pulse { until: Instant },
    Drain { until: Instant },
    Collect {
        until: Instant,
        start_count: u64,
        shortfall_reported: bool,
    },
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Waiting,
    /// Manual pulse over; the caller switches the relay off.
    PulseElapsed,
    CollectionStarted,
    Completed { weight_g: f64, samples: usize },
    Failed { got: usize, need: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recalibration {
    kind: RecalKind,
    phase: Phase,
}

impl Recalibration {
    /// Operator-started run: pump for `pulse`, then drain and collect.
    pub fn manual(now: Instant, pulse: Duration) -> Self {
        Self {
            kind: RecalKind::Manual,
            phase: Phase::Pulse { until: now + pulse },
        }
    }

    /// Re-baseline after an automatic pulse; the relay is already off.
    pub fn automatic(now: Instant) -> Self {
        Self {
            kind: RecalKind::Automatic,
            phase: Phase::Drain {
                until: now + DRAIN_WAIT,
            },
        }
    }

    pub fn kind(&self) -> RecalKind {
        self.kind
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Move to the next phase if the current deadline has passed.
    pub fn advance(&mut self, now: Instant, window: &SampleWindow) -> Step {
        match self.phase {
            Phase::Pulse { until } if now >= until => {
                self.phase = Phase::Drain {
                    until: now + DRAIN_WAIT,
                };
                Step::PulseElapsed
            }
            Phase::Drain { until } if now >= until => {
                self.start_collect(now, window);
                Step::CollectionStarted
            }
            Phase::Collect {
                until,
                start_count,
                shortfall_reported,
            } if now >= until => {
                let got = collected_since(window, start_count);
                let need = self.kind.min_samples();
                match window.mean_of_latest(got).filter(|_| got >= need) {
                    Some(weight_g) => {
                        self.phase = Phase::Finished;
                        Step::Completed {
                            weight_g,
                            samples: got,
                        }
                    }
                    None if shortfall_reported => Step::Waiting,
                    None => {
                        match self.kind {
                            RecalKind::Manual => self.phase = Phase::Finished,
                            RecalKind::Automatic => {
                                self.phase = Phase::Collect {
                                    until,
                                    start_count,
                                    shortfall_reported: true,
                                };
                            }
                        }
                        Step::Failed { got, need }
                    }
                }
            }
            _ => Step::Waiting,
        }
    }

    fn start_collect(&mut self, now: Instant, window: &SampleWindow) {
        self.phase = Phase::Collect {
            until: now + COLLECT_WINDOW,
            start_count: window.total_pushed(),
            shortfall_reported: false,
        };
    }
}

/// Samples pushed since `start_count` that are still in the buffer, capped at
/// `COLLECT_MAX`. A re-arm during collection clears the buffer, which caps the
/// count at what survived.
fn collected_since(window: &SampleWindow, start_count: u64) -> usize {
    let pushed = window.total_pushed().saturating_sub(start_count);
    let pushed = usize::try_from(pushed).unwrap_or(usize::MAX);
    pushed.min(window.len()).min(COLLECT_MAX)
}

/// Background thread driving a manual run through `poll_manual`.
///
/// The thread exits when the run finishes or when this handle is dropped.
pub struct ManualRecalibrator {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl ManualRecalibrator {
    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(std::thread::JoinHandle::is_finished)
    }
}

/// Start the scheduler thread for a manual run already begun with
/// `IrrigationController::start_manual`.
pub fn spawn_manual<R, C>(
    controller: Arc<Mutex<IrrigationController<R>>>,
    clock: C,
    tick: Duration,
) -> ManualRecalibrator
where
    R: Relay + Send + 'static,
    C: Clock + Send + 'static,
{
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    let join_handle = std::thread::spawn(move || {
        loop {
            if shutdown_clone.load(Ordering::Relaxed) {
                tracing::debug!("manual recalibration thread received shutdown signal");
                break;
            }
            let poll = match controller.lock() {
                Ok(mut ctrl) => ctrl.poll_manual(),
                Err(_) => {
                    tracing::error!("controller lock poisoned; abandoning manual run");
                    break;
                }
            };
            if poll == ManualPoll::Finished {
                break;
            }
            clock.sleep(tick);
        }
        tracing::trace!("manual recalibration thread exiting");
    });
    ManualRecalibrator {
        shutdown,
        join_handle: Some(join_handle),
    }
}

impl Drop for ManualRecalibrator {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            if let Err(e) = handle.join() {
                tracing::warn!(?e, "manual recalibration thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::Sample;

    fn filled(t0: Instant, n: usize, w: f64) -> SampleWindow {
        let mut win = SampleWindow::new();
        win.arm(t0);
        for _ in 0..n {
            win.push(Sample {
                at: t0,
                weight_g: w,
            });
        }
        win
    }

    #[test]
    fn manual_runs_through_all_phases() {
        let t0 = Instant::now();
        let mut win = filled(t0, 5, 1.0);
        let mut r = Recalibration::manual(t0, Duration::from_secs(5));
        assert_eq!(r.advance(t0 + Duration::from_secs(4), &win), Step::Waiting);
        let t_off = t0 + Duration::from_secs(5);
        assert_eq!(r.advance(t_off, &win), Step::PulseElapsed);
        assert_eq!(
            r.advance(t_off + Duration::from_secs(599), &win),
            Step::Waiting
        );
        let t_collect = t_off + DRAIN_WAIT;
        assert_eq!(r.advance(t_collect, &win), Step::CollectionStarted);
        for _ in 0..3 {
            win.push(Sample {
                at: t_collect,
                weight_g: 900.0,
            });
        }
        assert_eq!(
            r.advance(t_collect + COLLECT_WINDOW, &win),
            Step::Completed {
                weight_g: 900.0,
                samples: 3
            }
        );
        assert!(r.is_finished());
    }

    #[test]
    fn manual_with_no_samples_fails_and_finishes() {
        let t0 = Instant::now();
        let win = filled(t0, 60, 500.0);
        let mut r = Recalibration::automatic(t0);
        r.kind = RecalKind::Manual;
        assert_eq!(r.advance(t0 + DRAIN_WAIT, &win), Step::CollectionStarted);
        assert_eq!(
            r.advance(t0 + DRAIN_WAIT + COLLECT_WINDOW, &win),
            Step::Failed { got: 0, need: 1 }
        );
        assert!(r.is_finished());
    }

    #[test]
    fn automatic_shortfall_reports_once_and_keeps_collecting() {
        let t0 = Instant::now();
        let mut win = filled(t0, 0, 0.0);
        let mut r = Recalibration::automatic(t0);
        let tc = t0 + DRAIN_WAIT;
        assert_eq!(r.advance(tc, &win), Step::CollectionStarted);
        for _ in 0..59 {
            win.push(Sample {
                at: tc,
                weight_g: 1.0,
            });
        }
        let t_fail = tc + COLLECT_WINDOW;
        assert_eq!(r.advance(t_fail, &win), Step::Failed { got: 59, need: 60 });
        assert_eq!(
            r.phase(),
            Phase::Collect {
                until: t_fail,
                start_count: 0,
                shortfall_reported: true,
            }
        );
        assert_eq!(r.advance(t_fail + MANUAL_TICK, &win), Step::Waiting);

        win.push(Sample {
            at: t_fail,
            weight_g: 61.0,
        });
        assert_eq!(
            r.advance(t_fail + 2 * MANUAL_TICK, &win),
            Step::Completed {
                weight_g: 2.0,
                samples: 60
            }
        );
        assert!(r.is_finished());
    }

    #[test]
    fn collection_averages_latest_sixty_only() {
        let t0 = Instant::now();
        let mut win = filled(t0, 0, 0.0);
        let mut r = Recalibration::automatic(t0);
        let tc = t0 + DRAIN_WAIT;
        r.advance(tc, &win);
        for i in 0..90 {
            win.push(Sample {
                at: tc,
                weight_g: if i < 30 { 0.0 } else { 10.0 },
            });
        }
        assert_eq!(
            r.advance(tc + COLLECT_WINDOW, &win),
            Step::Completed {
                weight_g: 10.0,
                samples: 60
            }
        );
    }
}
