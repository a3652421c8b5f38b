mod cli;
mod console;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use irrigator_config::Config;
use irrigator_core::error::IrrigatorError;
use irrigator_core::{SettingsSource, TrayInputsExt, vwc_from_parts, weight_drop_threshold};
use serde_json::json;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::{RunArgs, backend_name, run_irrigator, tray_settings};

fn main() {
    if let Err(e) = real_main() {
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging);

    match cli.cmd {
        Commands::Run {
            tare,
            calibrate,
            start,
            exit_after_samples,
            console,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = Arc::clone(&shutdown);
                ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                    .map_err(|e| eyre::eyre!("install signal handler: {e}"))?;
            }
            let summary = run_irrigator(
                &cfg,
                RunArgs {
                    tare,
                    calibrate,
                    start,
                    exit_after_samples,
                    console,
                },
                shutdown,
            )?;
            if cli.json {
                println!(
                    "{}",
                    json!({
                        "timestamp": chrono::Local::now().timestamp(),
                        "backend": backend_name(),
                        "samples": summary.samples,
                        "long_averages": summary.long_averages,
                        "dropped": summary.dropped,
                        "errors": summary.errors,
                    })
                );
            } else {
                println!(
                    "run finished: {} samples, {} long averages, {} dropped lines, {} errors",
                    summary.samples, summary.long_averages, summary.dropped, summary.errors
                );
            }
        }
        Commands::Vwc {
            avg_weight,
            saturation_weight,
        } => {
            let inputs = tray_settings(&cfg).current();
            let vwc = inputs.tray_volume_ml().and_then(|volume| {
                vwc_from_parts(avg_weight, saturation_weight, volume, inputs.saturation_vwc()?)
            });
            if cli.json {
                println!(
                    "{}",
                    json!({
                        "avg_weight_g": avg_weight,
                        "saturation_weight_g": saturation_weight,
                        "vwc": vwc.as_ref().ok(),
                        "unavailable": vwc.as_ref().err().map(ToString::to_string),
                    })
                );
            } else {
                match &vwc {
                    Ok(v) => println!("{v:.3}"),
                    Err(e) => println!("NA ({e})"),
                }
            }
        }
        Commands::SelfCheck => {
            let inputs = tray_settings(&cfg).current();
            let threshold = weight_drop_threshold(&inputs);
            let pulse = inputs.relay_duration();
            #[cfg(all(feature = "hardware", target_os = "linux"))]
            {
                let _port = irrigator_hardware::SerialTransport::open(
                    &cfg.serial.port,
                    cfg.serial.baud_rate,
                    std::time::Duration::from_millis(cfg.serial.read_timeout_ms),
                )
                .map_err(|e| eyre::eyre!("open serial port: {e}"))?;
                let _relay = irrigator_hardware::GpioRelay::new(cfg.relay.pin, cfg.relay.active_high)
                    .map_err(|e| eyre::eyre!("init relay gpio: {e}"))?;
            }
            if cli.json {
                println!(
                    "{}",
                    json!({
                        "ok": true,
                        "backend": backend_name(),
                        "weight_drop_threshold_g": threshold.as_ref().ok(),
                        "relay_duration_s": pulse.as_ref().ok().map(std::time::Duration::as_secs_f64),
                    })
                );
            } else {
                println!("OK ({})", backend_name());
                match &threshold {
                    Ok(t) => println!("weight drop threshold: {t:.2} g"),
                    Err(e) => println!("weight drop threshold: NA ({e})"),
                }
                match &pulse {
                    Ok(d) => println!("relay duration: {:.1} s", d.as_secs_f64()),
                    Err(e) => println!("relay duration: NA ({e})"),
                }
            }
        }
    }
    Ok(())
}

fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        IrrigatorError::Config(format!("read config {}: {e}", path.display()))
    })?;
    let cfg = irrigator_config::load_toml(&text)
        .map_err(|e| IrrigatorError::Config(format!("parse config {}: {e}", path.display())))?;
    cfg.validate()
        .map_err(|e| IrrigatorError::Config(e.to_string()))?;
    Ok(cfg)
}

fn init_tracing(json: bool, level: &str, logging: &irrigator_config::Logging) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    // stdout is reserved for command output
    if json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    if let Some(file) = logging.file.as_deref() {
        use tracing_appender::rolling::{RollingFileAppender, Rotation};
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let prefix = path
            .file_name()
            .map_or_else(|| "irrigator.log".to_string(), |n| n.to_string_lossy().into_owned());
        let rotation = match logging.rotation.as_deref() {
            Some("daily") => Rotation::DAILY,
            Some("hourly") => Rotation::HOURLY,
            _ => Rotation::NEVER,
        };
        match RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(prefix)
            .build(dir)
        {
            Ok(appender) => {
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                let file_filter = EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))
                    .unwrap_or_else(|_| EnvFilter::new("info"));
                layers.push(
                    fmt::layer()
                        .json()
                        .with_ansi(false)
                        .with_writer(writer)
                        .with_filter(file_filter)
                        .boxed(),
                );
            }
            Err(e) => eprintln!("file logging disabled: {e}"),
        }
    }

    let _ = tracing_subscriber::registry().with(layers).try_init();
}
