use irrigator_config::{TrayInputs, load_toml, load_tray_file};
use rstest::rstest;
use std::fs;
use tempfile::tempdir;

#[test]
fn empty_file_uses_defaults_and_validates() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults should pass");
    assert_eq!(cfg.serial.port, "/dev/ttyACM0");
    assert_eq!(cfg.serial.baud_rate, 9600);
    assert_eq!(cfg.serial.read_timeout_ms, 2000);
    assert_eq!(cfg.relay.pin, 18);
    assert!(cfg.relay.active_high);
    assert_eq!(cfg.log.csv_file.to_string_lossy(), "weight_log.csv");
    assert_eq!(cfg.tray.inputs, TrayInputs::default());
}

#[test]
fn tray_values_accept_numbers_and_text() {
    let toml = r#"
[tray]
saturation_vwc = 60
threshold_vwc = 40.5
tray_volume_ml = "500"
relay_duration_s = "five"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("non-numeric tray text is not a config error");
    assert_eq!(cfg.tray.inputs.saturation_vwc, "60");
    assert_eq!(cfg.tray.inputs.threshold_vwc, "40.5");
    assert_eq!(cfg.tray.inputs.tray_volume_ml, "500");
    assert_eq!(cfg.tray.inputs.relay_duration_s, "five");
    assert!(cfg.tray.tray_file.is_none());
}

#[test]
fn tray_file_is_read_as_top_level_table() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tray.toml");
    fs::write(
        &path,
        "saturation_vwc = 55\nthreshold_vwc = 35\ntray_volume_ml = 800\nrelay_duration_s = 12\n",
    )
    .unwrap();
    let inputs = load_tray_file(&path).expect("load tray file");
    assert_eq!(inputs, TrayInputs::new("55", "35", "800", "12"));
}

#[test]
fn missing_tray_file_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.toml");
    let err = load_tray_file(&path).expect_err("missing file");
    assert!(format!("{err}").contains("nope.toml"));
}

#[rstest]
#[case("[serial]\nbaud_rate = 0\n", "serial.baud_rate must be > 0")]
#[case("[serial]\nread_timeout_ms = 0\n", "serial.read_timeout_ms must be >= 1")]
#[case("[serial]\nport = \"  \"\n", "serial.port must not be empty")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation must be one of")]
#[case("[simulation]\nperiod_ms = 0\n", "simulation.period_ms must be >= 1")]
#[case("[simulation]\ndry_rate_g_per_s = -1.0\n", "simulation.dry_rate_g_per_s must be >= 0")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "expected '{needle}' in '{err}'"
    );
}

#[test]
fn unknown_rotation_values_are_rejected_but_known_ones_pass() {
    for rot in ["never", "daily", "hourly"] {
        let cfg = load_toml(&format!("[logging]\nrotation = \"{rot}\"\n")).unwrap();
        cfg.validate().expect("known rotation");
    }
}
