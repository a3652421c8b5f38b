pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Line-oriented byte stream to the loadcell device (serial-like).
pub trait Transport {
    /// Read one line, blocking up to `timeout`.
    ///
    /// `Ok(None)` means no complete line arrived before the timeout; that is
    /// "no new sample", not an error.
    fn read_line(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

    /// Write one command line; implementations append the trailing newline.
    fn write_line(&mut self, line: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Binary pump relay.
pub trait Relay {
    fn on(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn off(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_line(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_line(timeout)
    }

    fn write_line(&mut self, line: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).write_line(line)
    }
}

impl<T: Relay + ?Sized> Relay for Box<T> {
    fn on(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).on()
    }

    fn off(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).off()
    }
}
