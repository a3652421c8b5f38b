use std::error::Error;
use std::time::Duration;

use irrigator_core::error::IrrigatorError;
use irrigator_core::{ControllerMode, IrrigationController, ManualPoll, StaticSettings, TrayInputs};
use irrigator_traits::Relay;
use irrigator_traits::clock::manual::ManualClock;

/// A relay whose OFF fails a fixed number of times.
#[derive(Default)]
struct StickyRelay {
    off_failures_left: u32,
    on: bool,
}

impl Relay for StickyRelay {
    fn on(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.on = true;
        Ok(())
    }

    fn off(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.off_failures_left > 0 {
            self.off_failures_left -= 1;
            return Err("gpio write failed".into());
        }
        self.on = false;
        Ok(())
    }
}

struct DeadRelay;
impl Relay for DeadRelay {
    fn on(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Err("relay driver timed out".into())
    }
    fn off(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

fn calibrated<R: Relay>(relay: R, clock: &ManualClock) -> IrrigationController<R> {
    let mut c = IrrigationController::builder()
        .with_relay(relay)
        .with_settings(StaticSettings(TrayInputs::new("60", "40", "500", "5")))
        .with_clock(clock.clone())
        .build()
        .unwrap();
    c.on_cal_done();
    c
}

#[test]
fn relay_errors_surface_as_typed_errors() {
    let clock = ManualClock::new();
    let mut c = calibrated(DeadRelay, &clock);
    let err = c.start_manual().unwrap_err();
    // "timed out" text maps to the timeout variant
    assert_eq!(err, IrrigatorError::Timeout);
    assert!(!c.relay_on());
    assert!(c.events().is_empty());
}

#[test]
fn failed_off_is_retried_on_the_next_tick() {
    let clock = ManualClock::new();
    let relay = StickyRelay {
        off_failures_left: 1,
        on: false,
    };
    let mut c = calibrated(relay, &clock);

    // baseline at 1000 g through a manual run; its OFF fails once
    c.start_manual().unwrap();
    let mut failures = 0;
    for _ in 0..2000 {
        clock.advance(Duration::from_secs(1));
        if c.ingest(1000.0).is_err() {
            failures += 1;
        }
        if c.poll_manual() == ManualPoll::Finished {
            break;
        }
    }
    assert_eq!(failures, 0);
    assert!(!c.relay().on);
    assert!(c.allow_relay());

    // automatic pulse: OFF fails once, then succeeds a tick later
    c.relay_mut().off_failures_left = 1;
    let mut errs = Vec::new();
    for _ in 0..200 {
        clock.advance(Duration::from_secs(1));
        match c.ingest(800.0) {
            Ok(_) => {}
            Err(e) => errs.push(e.downcast_ref::<IrrigatorError>().cloned()),
        }
        if c.mode() == ControllerMode::Draining {
            break;
        }
    }
    assert_eq!(errs, vec![Some(IrrigatorError::Relay("gpio write failed".into()))]);
    assert!(!c.relay().on);
    assert!(!c.allow_relay());
}
