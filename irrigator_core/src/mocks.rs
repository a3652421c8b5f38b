//! Test and helper mocks for irrigator_core

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use irrigator_traits::{Relay, Transport};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Relay that records commands and can be told to fail.
#[derive(Debug, Default)]
pub struct SpyRelay {
    pub fail_on: bool,
    pub fail_off: bool,
    ons: usize,
    offs: usize,
    energized: bool,
}

impl SpyRelay {
    pub fn ons(&self) -> usize {
        self.ons
    }

    pub fn offs(&self) -> usize {
        self.offs
    }

    pub fn is_energized(&self) -> bool {
        self.energized
    }
}

impl Relay for SpyRelay {
    fn on(&mut self) -> Result<(), BoxError> {
        if self.fail_on {
            return Err(Box::new(std::io::Error::other("relay stuck")));
        }
        self.ons += 1;
        self.energized = true;
        Ok(())
    }

    fn off(&mut self) -> Result<(), BoxError> {
        if self.fail_off {
            return Err(Box::new(std::io::Error::other("relay stuck")));
        }
        self.offs += 1;
        self.energized = false;
        Ok(())
    }
}

/// One scripted transport read.
#[derive(Debug, Clone)]
pub enum Scripted {
    Line(String),
    Fault(String),
}

/// Transport replaying a fixed script; idles with `Ok(None)` once exhausted.
/// Written commands are shared through [`ScriptedTransport::written`].
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: VecDeque<Scripted>,
    written: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: lines.into_iter().map(|l| Scripted::Line(l.into())).collect(),
            written: Arc::default(),
        }
    }

    pub fn from_script(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: script.into_iter().collect(),
            written: Arc::default(),
        }
    }

    pub fn written(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.written)
    }
}

impl Transport for ScriptedTransport {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, BoxError> {
        match self.script.pop_front() {
            Some(Scripted::Line(l)) => Ok(Some(l)),
            Some(Scripted::Fault(msg)) => Err(Box::new(std::io::Error::other(msg))),
            None => {
                std::thread::sleep(timeout.min(Duration::from_millis(5)));
                Ok(None)
            }
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), BoxError> {
        self.written
            .lock()
            .map_err(|_| std::io::Error::other("written buffer poisoned"))?
            .push(line.to_string());
        Ok(())
    }
}
