use std::time::Duration;

use irrigator_hardware::error::HwError;
use irrigator_hardware::{SimulatedTray, TrayModel};
use irrigator_traits::{Relay, Transport};
use rstest::rstest;

fn model(period_ms: u64) -> TrayModel {
    TrayModel {
        start_weight_g: 500.0,
        dry_rate_g_per_s: 1.0,
        pump_rate_g_per_s: 50.0,
        period: Duration::from_millis(period_ms),
    }
}

#[rstest]
#[case("tare", "tare_done")]
#[case("cal", "cal_done")]
#[case(" cal \r", "cal_done")]
fn board_acknowledges_commands(#[case] cmd: &str, #[case] ack: &str) {
    let mut tray = SimulatedTray::new(model(5));
    tray.write_line(cmd).unwrap();
    let line = tray.read_line(Duration::from_millis(50)).unwrap();
    assert_eq!(line.as_deref(), Some(ack));
}

#[test]
fn unknown_command_is_rejected() {
    let mut tray = SimulatedTray::new(model(5));
    let err = tray.write_line("reboot").unwrap_err();
    let hw = err.downcast_ref::<HwError>().expect("HwError");
    assert!(matches!(hw, HwError::UnknownCommand(c) if c == "reboot"));
}

#[test]
fn short_timeout_yields_no_line() {
    let mut tray = SimulatedTray::new(model(200));
    let line = tray.read_line(Duration::from_millis(5)).unwrap();
    assert_eq!(line, None);
    assert_eq!(tray.weight_g(), 500.0);
}

#[test]
fn weights_are_two_decimal_numbers() {
    let mut tray = SimulatedTray::new(model(5));
    let line = tray.read_line(Duration::from_millis(50)).unwrap().unwrap();
    let (_, frac) = line.split_once('.').expect("decimal point");
    assert_eq!(frac.len(), 2);
    assert!(line.parse::<f64>().unwrap() < 500.0);
}

#[test]
fn relay_clones_drive_the_same_pump() {
    let tray = SimulatedTray::new(model(5));
    let mut a = tray.relay();
    let b = a.clone();
    a.on().unwrap();
    assert!(b.is_on());
    a.off().unwrap();
    assert!(!b.is_on());
}
