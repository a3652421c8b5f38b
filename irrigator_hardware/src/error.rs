use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("serial read timeout")]
    Timeout,
    #[error("serial port error: {0}")]
    Serial(String),
    #[error("unknown device command: {0:?}")]
    UnknownCommand(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
