//! Frame detection in the caller's thread, sentence decoding in a background
//! thread, joined by a bounded queue.
//!
//! ```text
//! submit(bytes) -> FrameParser -> raw queue -> decode thread -> output queue
//! ```
//!
//! Both queues are bounded, so a slow consumer eventually blocks the decode
//! thread and then `submit`. Shutdown is driven by disconnection: `close`
//! drops the raw sender, the decode thread drains what is queued and exits,
//! and its exit drops the output sender. Dropping the output receiver stops
//! the decode thread, after which `submit` discards what it validates.

use std::io::{BufRead, ErrorKind};
use std::thread;

use crossbeam_channel::{bounded, select, Receiver, SendError, Sender};
use log::{debug, warn};
use nmeawave_decode::Sentence;

use crate::{Error, FrameParser, ParserStats, PipelineConfig, Result};

pub struct Pipeline {
    parser: FrameParser,
    raw_tx: Option<Sender<String>>,
}

impl Pipeline {
    /// Creates the queues and starts the decode thread. The receiver yields
    /// decoded sentences in the order their frames were validated; it is the
    /// only receiver of the output queue.
    pub fn new(config: PipelineConfig) -> (Self, Receiver<Sentence>) {
        let (raw_tx, raw_rx) = bounded::<String>(config.raw_capacity);
        let (out_tx, output) = bounded::<Sentence>(config.output_capacity);

        thread::spawn(move || decode_loop(raw_rx, out_tx));
        debug!(
            "pipeline started: raw capacity {}, output capacity {}, {:?}",
            config.raw_capacity, config.output_capacity, config.chunk_mode
        );

        let pipeline = Self {
            parser: FrameParser::new(&config),
            raw_tx: Some(raw_tx),
        };
        (pipeline, output)
    }

    /// Parses `bytes` as one chunk and queues every validated payload for
    /// decoding, blocking while the raw queue is full. Returns the number of
    /// frames validated by this call.
    ///
    /// # Panics
    ///
    /// If the pipeline has been closed.
    pub fn submit(&mut self, bytes: &[u8]) -> u64 {
        let raw_tx = open_sender(&self.raw_tx);
        self.parser.parse(bytes, |payload| forward(raw_tx, payload))
    }

    /// Like [`submit`](Self::submit), but stops waiting on a full raw queue
    /// as soon as `cancel` is ready, either holding a message or
    /// disconnected. Returns `None` if that happened; the payloads left in
    /// the chunk are then dropped. A message taken from `cancel` is consumed.
    ///
    /// # Panics
    ///
    /// If the pipeline has been closed.
    pub fn submit_cancellable<T>(&mut self, bytes: &[u8], cancel: &Receiver<T>) -> Option<u64> {
        let raw_tx = open_sender(&self.raw_tx);
        let mut cancelled = false;
        let frames = self.parser.parse(bytes, |payload| {
            if cancelled {
                return;
            }
            select! {
                send(raw_tx, payload) -> res => {
                    if let Err(SendError(payload)) = res {
                        warn!("decode thread gone, dropping payload {payload:?}");
                    }
                }
                recv(cancel) -> _ => {
                    debug!("submission cancelled while the raw queue was full");
                    cancelled = true;
                }
            }
        });
        (!cancelled).then_some(frames)
    }

    /// Parses everything `reader` yields up to end of input as one chunk.
    ///
    /// # Panics
    ///
    /// If the pipeline has been closed.
    pub fn submit_reader<R: std::io::Read>(&mut self, reader: R) -> Result<u64> {
        let raw_tx = open_sender(&self.raw_tx);
        self.parser.parse_reader(reader, |payload| forward(raw_tx, payload))
    }

    /// Submits `reader` one line at a time, each line (with its terminator)
    /// as its own chunk. Returns the total number of frames validated.
    ///
    /// # Panics
    ///
    /// If the pipeline has been closed.
    pub fn submit_lines<R: BufRead>(&mut self, mut reader: R) -> Result<u64> {
        let mut total = 0;
        let mut line = Vec::with_capacity(128);
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => return Ok(total),
                Ok(_) => total += self.submit(&line),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(source) => {
                    return Err(Error::Source {
                        frames: total,
                        source,
                    })
                }
            }
        }
    }

    /// Declares that no more bytes will be submitted. Sentences already
    /// queued are still decoded; the output queue disconnects after the last.
    pub fn close(&mut self) {
        if self.raw_tx.take().is_some() {
            debug!("pipeline closed after {} frames", self.parser.stats().validated);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.raw_tx.is_none()
    }

    pub fn stats(&self) -> ParserStats {
        self.parser.stats()
    }
}

fn open_sender(raw_tx: &Option<Sender<String>>) -> &Sender<String> {
    match raw_tx {
        Some(tx) => tx,
        None => panic!("submit called on a closed pipeline"),
    }
}

fn forward(raw_tx: &Sender<String>, payload: String) {
    if let Err(SendError(payload)) = raw_tx.send(payload) {
        warn!("decode thread gone, dropping payload {payload:?}");
    }
}

fn decode_loop(raw_rx: Receiver<String>, out_tx: Sender<Sentence>) {
    for payload in raw_rx.iter() {
        if out_tx.send(Sentence::decode(&payload)).is_err() {
            debug!("output queue has no receivers, decode thread exiting");
            return;
        }
    }
    debug!("raw queue drained, closing output queue");
}
