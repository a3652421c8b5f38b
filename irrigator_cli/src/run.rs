//! Rig assembly from config and the `run` command.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crossbeam_channel as xch;
use eyre::WrapErr;
use irrigator_config::Config;
use irrigator_core::runner::{self, OperatorCommand, RunOptions, RunSummary};
use irrigator_core::{
    CsvFileSink, Ingestion, IrrigationController, LineReader, ReaderTimings, SettingsSource,
    StaticSettings, TrayFileSettings,
};
use irrigator_traits::clock::MonotonicClock;
use irrigator_traits::{Relay, Transport};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunArgs {
    pub tare: bool,
    pub calibrate: bool,
    pub start: bool,
    pub exit_after_samples: Option<u64>,
    pub console: bool,
}

/// Live tray settings: the tray file when configured, else the inline table.
pub fn tray_settings(cfg: &Config) -> Box<dyn SettingsSource + Send> {
    let inline = cfg.tray.inputs.clone();
    match &cfg.tray.tray_file {
        Some(path) => Box::new(TrayFileSettings::new(path.clone(), inline)),
        None => Box::new(StaticSettings(inline)),
    }
}

pub fn reader_timings(cfg: &Config) -> ReaderTimings {
    ReaderTimings {
        read_timeout: Duration::from_millis(cfg.serial.read_timeout_ms),
        retry_pause: Duration::from_millis(cfg.serial.retry_pause_ms),
    }
}

/// Name of the backend this binary drives.
pub const fn backend_name() -> &'static str {
    if cfg!(all(feature = "hardware", target_os = "linux")) {
        "hardware"
    } else {
        "simulation"
    }
}

pub fn run_irrigator(
    cfg: &Config,
    args: RunArgs,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunSummary> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let transport = irrigator_hardware::SerialTransport::open(
            &cfg.serial.port,
            cfg.serial.baud_rate,
            Duration::from_millis(cfg.serial.read_timeout_ms),
        )
        .wrap_err("open serial port")?;
        let relay = irrigator_hardware::GpioRelay::new(cfg.relay.pin, cfg.relay.active_high)
            .wrap_err("init relay gpio")?;
        drive(cfg, args, transport, relay, &shutdown)
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        use irrigator_hardware::{SimulatedTray, TrayModel};
        let tray = SimulatedTray::new(TrayModel {
            start_weight_g: cfg.simulation.start_weight_g,
            dry_rate_g_per_s: cfg.simulation.dry_rate_g_per_s,
            pump_rate_g_per_s: cfg.simulation.pump_rate_g_per_s,
            period: Duration::from_millis(cfg.simulation.period_ms),
        });
        let relay = tray.relay();
        drive(cfg, args, tray, relay, &shutdown)
    }
}

fn drive<T, R>(
    cfg: &Config,
    args: RunArgs,
    transport: T,
    relay: R,
    shutdown: &AtomicBool,
) -> eyre::Result<RunSummary>
where
    T: Transport + Send + 'static,
    R: Relay + Send + 'static,
{
    let controller = IrrigationController::builder()
        .with_relay(relay)
        .with_settings(tray_settings(cfg))
        .with_sink(CsvFileSink::new(cfg.log.csv_file.clone()))
        .build()
        .wrap_err("build irrigation controller")?;
    let ingestion = Ingestion::new(controller);
    let reader = LineReader::spawn(transport, reader_timings(cfg), MonotonicClock::new());

    let (op_tx, op_rx) = xch::unbounded::<OperatorCommand>();
    let startup = [
        (args.tare, OperatorCommand::Tare),
        (args.calibrate, OperatorCommand::Cal),
        (args.start, OperatorCommand::StartManual),
    ];
    for (_, cmd) in startup.iter().filter(|(wanted, _)| *wanted) {
        op_tx
            .send(*cmd)
            .wrap_err("queue startup command")?;
    }
    if args.console {
        crate::console::spawn(op_tx, ingestion.clone());
    }

    tracing::info!(
        backend = backend_name(),
        csv = %cfg.log.csv_file.display(),
        "irrigator running"
    );
    let summary = runner::run(
        &ingestion,
        &reader,
        &op_rx,
        shutdown,
        RunOptions {
            exit_after_samples: args.exit_after_samples,
            ..RunOptions::default()
        },
    )?;
    tracing::info!(faults = reader.faults(), "line reader fault count");
    Ok(summary)
}
