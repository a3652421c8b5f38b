//! Rolling weight buffer with wall-clock-gated short and long averages.
//!
//! One ring buffer of `LONG_N` samples serves both window classes. Each class
//! emits at most once per its duration and only after its activation time,
//! which is set when the device reports calibration complete. Before the first
//! `arm` the window rejects samples, so pre-calibration readings never reach an
//! average.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Samples in the short (10 s) average.
pub const SHORT_N: usize = 10;
/// Samples in the long (60 s) average; also the buffer capacity.
pub const LONG_N: usize = 60;
pub const SHORT_WINDOW: Duration = Duration::from_secs(10);
pub const LONG_WINDOW: Duration = Duration::from_secs(60);

/// A single parsed weight reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub at: Instant,
    pub weight_g: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowClass {
    Short,
    Long,
}

impl WindowClass {
    #[inline]
    pub fn samples(self) -> usize {
        match self {
            Self::Short => SHORT_N,
            Self::Long => LONG_N,
        }
    }

    #[inline]
    pub fn duration(self) -> Duration {
        match self {
            Self::Short => SHORT_WINDOW,
            Self::Long => LONG_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Cadence {
    active_from: Option<Instant>,
    last_emit: Option<Instant>,
}

impl Cadence {
    fn due(&self, class: WindowClass, now: Instant) -> bool {
        let Some(from) = self.active_from else {
            return false;
        };
        if now < from {
            return false;
        }
        match self.last_emit {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= class.duration(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleWindow {
    buf: VecDeque<Sample>,
    short: Cadence,
    long: Cadence,
    armed: bool,
    total_pushed: u64,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleWindow {
    pub fn new() -> Self {
        Self {
            buf: VecDeque::with_capacity(LONG_N),
            short: Cadence::default(),
            long: Cadence::default(),
            armed: false,
            total_pushed: 0,
        }
    }

    /// Start (or restart) measurement at `now`: drop buffered samples and
    /// schedule the first short/long emissions one full window later.
    pub fn arm(&mut self, now: Instant) {
        self.buf.clear();
        self.short = Cadence {
            active_from: Some(now + SHORT_WINDOW),
            last_emit: None,
        };
        self.long = Cadence {
            active_from: Some(now + LONG_WINDOW),
            last_emit: None,
        };
        self.armed = true;
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Append a sample. Returns false (and drops it) when not armed.
    pub fn push(&mut self, sample: Sample) -> bool {
        if !self.armed {
            return false;
        }
        if self.buf.len() == LONG_N {
            self.buf.pop_front();
        }
        self.buf.push_back(sample);
        self.total_pushed = self.total_pushed.saturating_add(1);
        true
    }

    pub fn try_emit_short(&mut self, now: Instant) -> Option<f64> {
        self.try_emit(WindowClass::Short, now)
    }

    pub fn try_emit_long(&mut self, now: Instant) -> Option<f64> {
        self.try_emit(WindowClass::Long, now)
    }

    fn try_emit(&mut self, class: WindowClass, now: Instant) -> Option<f64> {
        let n = class.samples();
        let cadence = match class {
            WindowClass::Short => &mut self.short,
            WindowClass::Long => &mut self.long,
        };
        if self.buf.len() < n || !cadence.due(class, now) {
            return None;
        }
        cadence.last_emit = Some(now);
        self.mean_of_latest(n)
    }

    /// Mean of the most recent `n` samples (fewer if the buffer is shorter).
    /// `None` when `n == 0` or the buffer is empty.
    pub fn mean_of_latest(&self, n: usize) -> Option<f64> {
        let take = n.min(self.buf.len());
        if take == 0 {
            return None;
        }
        let sum: f64 = self.buf.iter().rev().take(take).map(|s| s.weight_g).sum();
        Some(sum / take as f64)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Samples accepted since construction; never decreases, survives `arm`.
    #[inline]
    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }

    pub fn latest(&self) -> Option<Sample> {
        self.buf.back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(base: Instant, s: u64) -> Instant {
        base + Duration::from_secs(s)
    }

    #[test]
    fn rejects_samples_before_arm() {
        let t0 = Instant::now();
        let mut w = SampleWindow::new();
        assert!(!w.push(Sample {
            at: t0,
            weight_g: 1.0
        }));
        assert!(w.is_empty());
        assert_eq!(w.total_pushed(), 0);
    }

    #[test]
    fn arm_discards_earlier_samples() {
        let t0 = Instant::now();
        let mut w = SampleWindow::new();
        w.arm(t0);
        for i in 0..5 {
            w.push(Sample {
                at: secs(t0, i),
                weight_g: 999.0,
            });
        }
        w.arm(secs(t0, 5));
        assert!(w.is_empty());
        assert_eq!(w.total_pushed(), 5);
    }

    #[test]
    fn short_average_waits_for_activation_and_count() {
        let t0 = Instant::now();
        let mut w = SampleWindow::new();
        w.arm(t0);
        for i in 0..9 {
            w.push(Sample {
                at: secs(t0, i),
                weight_g: 10.0,
            });
        }
        // activation time (t0+10s) not reached yet
        assert_eq!(w.try_emit_short(secs(t0, 9)), None);
        w.push(Sample {
            at: secs(t0, 9),
            weight_g: 20.0,
        });
        assert_eq!(w.try_emit_short(secs(t0, 9)), None);
        // activation reached, 10 samples
        assert_eq!(w.try_emit_short(secs(t0, 10)), Some(11.0));
    }

    #[test]
    fn short_average_is_cadence_gated() {
        let t0 = Instant::now();
        let mut w = SampleWindow::new();
        w.arm(t0);
        for i in 0..10 {
            w.push(Sample {
                at: secs(t0, i),
                weight_g: 5.0,
            });
        }
        assert!(w.try_emit_short(secs(t0, 10)).is_some());
        w.push(Sample {
            at: secs(t0, 11),
            weight_g: 15.0,
        });
        assert_eq!(w.try_emit_short(secs(t0, 19)), None);
        assert_eq!(w.try_emit_short(secs(t0, 20)), Some(6.0));
    }

    #[test]
    fn buffer_is_bounded_to_long_window() {
        let t0 = Instant::now();
        let mut w = SampleWindow::new();
        w.arm(t0);
        for i in 0..500u64 {
            w.push(Sample {
                at: secs(t0, i),
                weight_g: i as f64,
            });
        }
        assert_eq!(w.len(), LONG_N);
        assert_eq!(w.total_pushed(), 500);
        assert_eq!(w.latest().map(|s| s.weight_g), Some(499.0));
        // mean of 440..=499
        assert_eq!(w.try_emit_long(secs(t0, 500)), Some(469.5));
    }

    #[test]
    fn mean_of_latest_handles_short_buffers() {
        let t0 = Instant::now();
        let mut w = SampleWindow::new();
        assert_eq!(w.mean_of_latest(60), None);
        w.arm(t0);
        w.push(Sample {
            at: t0,
            weight_g: 4.0,
        });
        w.push(Sample {
            at: t0,
            weight_g: 8.0,
        });
        assert_eq!(w.mean_of_latest(60), Some(6.0));
        assert_eq!(w.mean_of_latest(1), Some(8.0));
        assert_eq!(w.mean_of_latest(0), None);
    }
}
