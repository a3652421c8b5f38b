use std::io::{ErrorKind, Read};
use std::time::Instant;

/// Accumulates raw bytes and yields complete `\n`-terminated lines.
///
/// Partial lines survive across reads; `\r` and surrounding whitespace are
/// trimmed; invalid UTF-8 is replaced rather than rejected.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

/// Drop buffered bytes past this size without a newline (line noise).
pub const MAX_PENDING: usize = 4096;

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        if self.buf.len() > MAX_PENDING && !self.buf.contains(&b'\n') {
            tracing::warn!(bytes = self.buf.len(), "discarding unterminated serial input");
            self.buf.clear();
        }
    }

    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.buf.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }

    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Read from `src` until a full line is buffered or `deadline` passes.
    /// A read timeout or a zero-length read ends the attempt with `Ok(None)`.
    pub fn fill_from<R: Read + ?Sized>(
        &mut self,
        src: &mut R,
        deadline: Instant,
    ) -> std::io::Result<Option<String>> {
        if let Some(line) = self.next_line() {
            return Ok(Some(line));
        }
        let mut chunk = [0u8; 256];
        loop {
            match src.read(&mut chunk) {
                Ok(0) => return Ok(None),
                Ok(n) => {
                    self.push(&chunk[..n]);
                    if let Some(line) = self.next_line() {
                        return Ok(Some(line));
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(None),
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }
}
