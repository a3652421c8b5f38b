//! Background line reader.
//!
//! Spawns a thread that owns the `Transport`, forwards complete lines through
//! a bounded channel and writes queued device commands between reads. Read
//! faults are logged, followed by a short pause, and never end the thread.
//!
//! The thread is shut down and joined when the `LineReader` is dropped.
use crossbeam_channel as xch;
use irrigator_traits::Transport;
use irrigator_traits::clock::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::error::IrrigatorError;
use crate::hw_error::{Seam, map_hw_error};

/// Capacity of the line channel.
pub const LINE_QUEUE: usize = 64;
/// How often a blocked send re-checks the shutdown flag.
const SEND_POLL: Duration = Duration::from_millis(50);

/// Outbound device command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    Tare,
    Cal,
}

impl DeviceCommand {
    pub fn as_line(self) -> &'static str {
        match self {
            Self::Tare => "tare",
            Self::Cal => "cal",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReaderTimings {
    pub read_timeout: Duration,
    pub retry_pause: Duration,
}

impl Default for ReaderTimings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(2),
            retry_pause: Duration::from_millis(100),
        }
    }
}

pub struct LineReader {
    rx: xch::Receiver<String>,
    cmd_tx: xch::Sender<DeviceCommand>,
    faults: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl LineReader {
    pub fn spawn<T, C>(mut transport: T, timings: ReaderTimings, clock: C) -> Self
    where
        T: Transport + Send + 'static,
        C: Clock + Send + 'static,
    {
        let (tx, rx) = xch::bounded::<String>(LINE_QUEUE);
        let (cmd_tx, cmd_rx) = xch::unbounded::<DeviceCommand>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let faults = Arc::new(AtomicU64::new(0));
        let faults_clone = faults.clone();

        let join_handle = std::thread::spawn(move || {
            'outer: loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("line reader received shutdown signal");
                    break;
                }

                for cmd in cmd_rx.try_iter() {
                    match transport.write_line(cmd.as_line()) {
                        Ok(()) => tracing::info!(command = cmd.as_line(), "device command sent"),
                        Err(e) => tracing::warn!(
                            command = cmd.as_line(),
                            error = %map_hw_error(&*e, Seam::Transport),
                            "device command not sent"
                        ),
                    }
                }

                match transport.read_line(timings.read_timeout) {
                    Ok(Some(line)) => {
                        let mut pending = line;
                        loop {
                            match tx.send_timeout(pending, SEND_POLL) {
                                Ok(()) => break,
                                Err(xch::SendTimeoutError::Timeout(l)) => {
                                    if shutdown_clone.load(Ordering::Relaxed) {
                                        break 'outer;
                                    }
                                    pending = l;
                                }
                                Err(xch::SendTimeoutError::Disconnected(_)) => {
                                    tracing::debug!("line consumer disconnected, exiting reader");
                                    break 'outer;
                                }
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        faults_clone.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            error = %map_hw_error(&*e, Seam::Transport),
                            "transport read failed; retrying"
                        );
                        if shutdown_clone.load(Ordering::Relaxed) {
                            break;
                        }
                        clock.sleep(timings.retry_pause);
                    }
                }
            }
            tracing::trace!("line reader thread exiting cleanly");
        });

        Self {
            rx,
            cmd_tx,
            faults,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Next line, waiting up to `timeout`. `None` on timeout or after the
    /// reader thread has gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<String> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Queue a command for the device; written before the next read.
    pub fn send_command(&self, cmd: DeviceCommand) -> Result<(), IrrigatorError> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| IrrigatorError::Transport("line reader stopped".into()))
    }

    /// Transport read faults seen so far.
    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }
}

impl Drop for LineReader {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits after the current read returns (bounded by the
        // read timeout) or after the current retry pause.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("line reader thread joined"),
                Err(e) => tracing::warn!(?e, "line reader thread panicked during shutdown"),
            }
        }
    }
}
