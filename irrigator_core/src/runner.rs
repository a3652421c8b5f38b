//! The ingestion run loop.
//!
//! Pulls lines from a [`LineReader`], applies them through [`Ingestion`] and
//! serves operator commands between lines, until the shutdown flag is set or
//! an optional sample budget is spent. The relay is commanded OFF on exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use irrigator_traits::Relay;

use crate::error::Result;
use crate::ingest::{Ingestion, LineOutcome};
use crate::reader::{DeviceCommand, LineReader};
use crate::recalibration::{MANUAL_TICK, ManualRecalibrator, spawn_manual};

/// Operator actions accepted while the loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Tare,
    Cal,
    StartManual,
    Quit,
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Stop after this many weight samples (tests, demos).
    pub exit_after_samples: Option<u64>,
    /// Upper bound on how long one wait for a line may block.
    pub poll: Duration,
    /// Scheduler tick of manual runs.
    pub manual_tick: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            exit_after_samples: None,
            poll: Duration::from_millis(200),
            manual_tick: MANUAL_TICK,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub samples: u64,
    pub long_averages: u64,
    pub dropped: u64,
    pub errors: u64,
}

/// Run until `shutdown` is set, `Quit` arrives or the sample budget is spent.
///
/// Errors from single lines or operator commands (e.g. a relay that refuses a
/// command, a reader thread that has stopped) are logged and counted; the loop
/// keeps going and the relay is switched OFF on every exit.
pub fn run<R>(
    ingestion: &Ingestion<R>,
    reader: &LineReader,
    operator: &xch::Receiver<OperatorCommand>,
    shutdown: &AtomicBool,
    opts: RunOptions,
) -> Result<RunSummary>
where
    R: Relay + Send + 'static,
{
    let mut summary = RunSummary::default();
    let mut manual: Option<ManualRecalibrator> = None;

    'run: loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }

        for cmd in operator.try_iter() {
            if cmd == OperatorCommand::Quit {
                tracing::info!("operator quit");
                break 'run;
            }
            if let Err(e) = serve_command(cmd, ingestion, reader, opts, &mut manual) {
                summary.errors += 1;
                tracing::error!(error = %e, command = ?cmd, "operator command failed");
            }
        }

        let Some(line) = reader.recv_timeout(opts.poll) else {
            continue;
        };
        match ingestion.handle_line(&line) {
            Ok(LineOutcome::Sample(tick)) => {
                summary.samples += 1;
                if tick.long_avg.is_some() {
                    summary.long_averages += 1;
                }
            }
            Ok(LineOutcome::Dropped) => summary.dropped += 1,
            Ok(LineOutcome::TareDone | LineOutcome::CalDone) => {}
            Err(e) => {
                summary.errors += 1;
                tracing::error!(error = %e, "sample processing failed");
            }
        }
        if opts
            .exit_after_samples
            .is_some_and(|limit| summary.samples >= limit)
        {
            tracing::info!(samples = summary.samples, "sample budget reached");
            break;
        }
    }

    // stop the manual thread before the final relay OFF
    drop(manual);
    ingestion.lock()?.shutdown();
    tracing::info!(?summary, "run loop finished");
    Ok(summary)
}

fn serve_command<R>(
    cmd: OperatorCommand,
    ingestion: &Ingestion<R>,
    reader: &LineReader,
    opts: RunOptions,
    manual: &mut Option<ManualRecalibrator>,
) -> Result<()>
where
    R: Relay + Send + 'static,
{
    match cmd {
        OperatorCommand::Tare => {
            reader.send_command(DeviceCommand::Tare)?;
            ingestion.lock()?.note_tare_sent();
        }
        OperatorCommand::Cal => {
            reader.send_command(DeviceCommand::Cal)?;
            ingestion.lock()?.note_cal_sent();
        }
        OperatorCommand::StartManual => {
            let started = ingestion.lock()?.start_manual();
            match started {
                Ok(()) => {
                    let clock = ingestion.lock()?.clock();
                    *manual = Some(spawn_manual(ingestion.controller(), clock, opts.manual_tick));
                }
                Err(e) => tracing::warn!(error = %e, "manual run not started"),
            }
        }
        OperatorCommand::Quit => {}
    }
    Ok(())
}
