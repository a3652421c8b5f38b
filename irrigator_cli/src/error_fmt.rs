//! Human-readable error descriptions and structured JSON error formatting.

use irrigator_core::error::{BuildError, IrrigatorError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingRelay => {
                "What happened: No relay was provided to the controller.\nLikely causes: The pump relay failed to initialize or was not wired into the builder.\nHow to fix: Ensure the relay is created successfully and passed via with_relay(...).".to_string()
            }
            BuildError::MissingSettings => {
                "What happened: No tray settings were provided to the controller.\nLikely causes: The [tray] table could not be turned into a settings source.\nHow to fix: Add a [tray] table (or tray_file) to the config and rerun.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/irrigator.toml for a sample."
            ),
        };
    }

    if let Some(ie) = err.downcast_ref::<IrrigatorError>() {
        return match ie {
            IrrigatorError::Timeout => "What happened: The loadcell board did not answer in time.\nLikely causes: Wrong serial port, board not powered, or read timeout too low.\nHow to fix: Check serial.port and the USB cable, and consider raising serial.read_timeout_ms.".to_string(),
            IrrigatorError::Relay(msg) => format!(
                "What happened: The pump relay rejected a command ({msg}).\nLikely causes: Wrong relay pin or insufficient GPIO permissions.\nHow to fix: Check [relay] pin/active_high and that the process may access GPIO."
            ),
            IrrigatorError::Transport(msg) | IrrigatorError::HardwareFault(msg) => format!(
                "What happened: Talking to the loadcell board failed ({msg}).\nLikely causes: Cable unplugged, board reset, or another process holding the port.\nHow to fix: Reconnect the board and rerun."
            ),
            IrrigatorError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file and try again."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("serial port") || lower.contains("/dev/tty") {
        return "What happened: Failed to open the serial port.\nLikely causes: Wrong serial.port path, board unplugged, or missing dialout permissions.\nHow to fix: Fix serial.port in the config and check the device exists.".to_string();
    }

    if lower.contains("gpio") {
        return "What happened: Failed to initialize the relay pin.\nLikely causes: Incorrect pin number or insufficient GPIO permissions.\nHow to fix: Fix [relay] pin in the config; ensure the process has permission to access GPIO.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 for configuration problems, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    match err.downcast_ref::<IrrigatorError>() {
        Some(IrrigatorError::Config(_)) => 2,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<IrrigatorError>() {
        Some(IrrigatorError::Config(_)) => "Config",
        Some(IrrigatorError::Timeout) => "Timeout",
        Some(IrrigatorError::Relay(_)) => "Relay",
        Some(IrrigatorError::Transport(_) | IrrigatorError::HardwareFault(_)) => "Transport",
        Some(_) => "Controller",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_two() {
        let e = eyre::Report::new(IrrigatorError::Config("serial.port must not be empty".into()));
        assert_eq!(exit_code_for_error(&e), 2);
        assert!(humanize(&e).contains("serial.port must not be empty"));
    }

    #[test]
    fn json_error_carries_reason() {
        let e = eyre::Report::new(IrrigatorError::Timeout);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "Timeout");
        assert_eq!(v["exit_code"], 1);
    }

    #[test]
    fn untyped_errors_fall_back() {
        let e = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&e), 1);
        assert!(humanize(&e).contains("Original: boom"));
    }
}
