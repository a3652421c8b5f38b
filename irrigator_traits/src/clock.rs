use chrono::{DateTime, Local};
use std::thread;
use std::time::{Duration, Instant};

/// Clock abstraction for control and timing across the stack.
///
/// - now(): returns a monotonic Instant, used for every deadline
/// - wall_now(): local wall-clock time, used only for log rows and history
/// - sleep(): sleeps for the provided duration (implementations may simulate)
pub trait Clock {
    fn now(&self) -> Instant;
    fn wall_now(&self) -> DateTime<Local>;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_millis() as u64
    }
}

/// Default, real-time clock backed by std::time::Instant and chrono::Local.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn wall_now(&self) -> DateTime<Local> {
        Local::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn wall_now(&self) -> DateTime<Local> {
        (**self).wall_now()
    }

    fn sleep(&self, d: Duration) {
        (**self).sleep(d)
    }
}

pub mod manual {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Deterministic clock whose time can be advanced manually.
    ///
    /// now() = origin + offset, wall_now() = wall_origin + offset.
    /// sleep(d) advances internal time by d without actually sleeping.
    /// Clones share the same offset, so one handle can drive several threads.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        origin: Instant,
        wall_origin: DateTime<Local>,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                wall_origin: Local::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Set the absolute offset relative to origin.
        pub fn set_offset(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = d;
            }
        }

        /// Current offset from the origin.
        pub fn offset(&self) -> Duration {
            self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
        }

        /// The Instant this clock started at (offset zero).
        pub fn origin(&self) -> Instant {
            self.origin
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.origin + self.offset()
        }

        fn wall_now(&self) -> DateTime<Local> {
            let off = chrono::Duration::from_std(self.offset()).unwrap_or(chrono::Duration::zero());
            self.wall_origin + off
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }

}
