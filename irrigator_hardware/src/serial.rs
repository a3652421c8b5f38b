use std::io::Write;
use std::time::{Duration, Instant};

use irrigator_traits::Transport;

use crate::error::{HwError, Result};
use crate::line::LineBuffer;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The board resets when the port opens; give it time to boot.
pub const OPEN_SETTLE: Duration = Duration::from_secs(2);

/// Line transport over a serial port.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    lines: LineBuffer,
}

impl SerialTransport {
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|e| HwError::Serial(format!("{path}: {e}")))?;
        tracing::info!(path, baud_rate, "serial port opened");
        std::thread::sleep(OPEN_SETTLE);
        Ok(Self {
            port,
            lines: LineBuffer::new(),
        })
    }
}

impl Transport for SerialTransport {
    fn read_line(&mut self, timeout: Duration) -> std::result::Result<Option<String>, BoxError> {
        if let Some(line) = self.lines.next_line() {
            return Ok(Some(line));
        }
        self.port
            .set_timeout(timeout)
            .map_err(|e| HwError::Serial(e.to_string()))?;
        let deadline = Instant::now() + timeout;
        let line = self
            .lines
            .fill_from(&mut self.port, deadline)
            .map_err(HwError::Io)?;
        Ok(line)
    }

    fn write_line(&mut self, line: &str) -> std::result::Result<(), BoxError> {
        self.port
            .write_all(format!("{line}\n").as_bytes())
            .map_err(HwError::Io)?;
        self.port.flush().map_err(HwError::Io)?;
        Ok(())
    }
}
