use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use irrigator_core::mocks::SpyRelay;
use irrigator_core::recalibration::{MANUAL_TICK, spawn_manual};
use irrigator_core::{
    ControllerMode, IrrigationController, IrrigatorError, ManualPoll, StaticSettings, Status,
    TrayInputs,
};
use irrigator_traits::clock::manual::ManualClock;

fn shared_controller(clock: &ManualClock) -> Arc<Mutex<IrrigationController<SpyRelay>>> {
    let ctrl = IrrigationController::builder()
        .with_relay(SpyRelay::default())
        .with_settings(StaticSettings(TrayInputs::new("60", "40", "500", "5")))
        .with_clock(clock.clone())
        .build()
        .unwrap();
    Arc::new(Mutex::new(ctrl))
}

fn wait_finished(handle: &irrigator_core::ManualRecalibrator) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !handle.is_finished() {
        assert!(Instant::now() < deadline, "manual thread did not finish");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn thread_runs_phases_and_fails_soft_without_samples() {
    let clock = ManualClock::new();
    let ctrl = shared_controller(&clock);
    ctrl.lock().unwrap().start_manual().unwrap();

    let handle = spawn_manual(ctrl.clone(), clock.clone(), MANUAL_TICK);
    wait_finished(&handle);
    drop(handle);

    let c = ctrl.lock().unwrap();
    assert!(!c.relay_on());
    assert_eq!(c.relay().ons(), 1);
    assert_eq!(c.relay().offs(), 1);
    assert!(!c.allow_relay());
    assert_eq!(c.baseline().weight(), None);
    assert_eq!(c.status(), &Status::InsufficientData { got: 0, need: 1 });
    assert_eq!(c.mode(), ControllerMode::Idle);
    assert!(!c.manual_active());
    // pulse, drain and collection all ran on the scheduler clock
    assert!(clock.offset() >= Duration::from_secs(5 + 600 + 60));
}

#[test]
fn second_start_is_rejected_while_active() {
    let clock = ManualClock::new();
    let ctrl = shared_controller(&clock);
    let mut c = ctrl.lock().unwrap();
    c.start_manual().unwrap();
    assert!(matches!(c.start_manual(), Err(IrrigatorError::Busy(_))));
    assert_eq!(c.relay().ons(), 1);
    assert!(c.manual_active());
}

#[test]
fn operator_may_retry_after_a_failed_run() {
    let clock = ManualClock::new();
    let ctrl = shared_controller(&clock);
    ctrl.lock().unwrap().start_manual().unwrap();
    let handle = spawn_manual(ctrl.clone(), clock.clone(), MANUAL_TICK);
    wait_finished(&handle);
    drop(handle);

    let mut c = ctrl.lock().unwrap();
    c.start_manual().unwrap();
    assert!(c.relay_on());
    assert_eq!(c.status(), &Status::ManualRunStarted);
}

#[test]
fn dropping_the_handle_stops_the_thread() {
    let clock = ManualClock::new();
    let ctrl = shared_controller(&clock);
    ctrl.lock().unwrap().start_manual().unwrap();
    // real-time ticks: the run cannot finish before the drop
    let handle = spawn_manual(
        ctrl.clone(),
        irrigator_traits::MonotonicClock::new(),
        Duration::from_millis(10),
    );
    std::thread::sleep(Duration::from_millis(30));
    drop(handle);
    assert!(ctrl.lock().unwrap().manual_active());
}

#[test]
fn manual_pulse_retries_off_after_relay_fault() {
    let clock = ManualClock::new();
    let ctrl = shared_controller(&clock);
    let mut c = ctrl.lock().unwrap();
    c.start_manual().unwrap();
    clock.advance(Duration::from_secs(5));

    c.relay_mut().fail_off = true;
    assert_eq!(c.poll_manual(), ManualPoll::Running);
    assert!(c.relay_on());
    assert_eq!(c.mode(), ControllerMode::Irrigating);

    c.relay_mut().fail_off = false;
    clock.advance(MANUAL_TICK);
    assert_eq!(c.poll_manual(), ManualPoll::Running);
    assert!(!c.relay_on());
    assert_eq!(c.mode(), ControllerMode::Draining);
}
