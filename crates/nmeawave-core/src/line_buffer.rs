use std::time::{Duration, Instant};

/// A partial line older than this is flushed on its own.
pub const DEFAULT_IDLE_FLUSH: Duration = Duration::from_millis(100);
/// A partial line longer than this is flushed without waiting for `\n`, up to
/// its last `$` when there is one.
pub const DEFAULT_MAX_LINE: usize = 1024;

/// Regroups arbitrary reads into newline-terminated chunks, so that a
/// reset-per-chunk pipeline sees whole sentences even when the device splits
/// them across reads.
#[derive(Debug)]
pub struct LineAssembler {
    buf: Vec<u8>,
    last_rx: Option<Instant>,
    idle_flush: Duration,
    max_line: usize,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_FLUSH, DEFAULT_MAX_LINE)
    }
}

impl LineAssembler {
    pub fn new(idle_flush: Duration, max_line: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_line),
            last_rx: None,
            idle_flush,
            max_line,
        }
    }

    /// Appends `data` received at `now` and returns every chunk that is ready.
    pub fn push(&mut self, data: &[u8], now: Instant) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        chunks.extend(self.take_stale(now));

        self.buf.extend_from_slice(data);
        self.last_rx = Some(now);

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            chunks.push(self.buf.drain(..=pos).collect());
        }

        if self.buf.len() > self.max_line {
            // keep a frame that started after the noise
            match self.buf.iter().rposition(|&b| b == b'$') {
                Some(start) if start > 0 => chunks.push(self.buf.drain(..start).collect()),
                _ => chunks.push(std::mem::take(&mut self.buf)),
            }
        }

        chunks
    }

    /// Returns the pending partial line if nothing arrived for the idle period.
    pub fn take_stale(&mut self, now: Instant) -> Option<Vec<u8>> {
        let last = self.last_rx?;
        if self.buf.is_empty() || now.duration_since(last) <= self.idle_flush {
            return None;
        }
        Some(std::mem::take(&mut self.buf))
    }

    /// Returns whatever is pending, regardless of age.
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }

    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
