//! Byte-at-a-time frame detection.
//!
//! A frame is `$<payload>*<d1><d2>`. The parser accumulates the payload and
//! its XOR digest while capturing, then compares the two digits that follow
//! `*` against the digest. Only frames whose digits match are emitted; broken
//! and truncated frames are dropped without surfacing an error.

use std::io::{ErrorKind, Read};

use log::{debug, trace};
use nmeawave_decode::render_digest;

use crate::{ChecksumCase, ChunkMode, Error, PayloadEncoding, PipelineConfig, Result};

pub const START: u8 = b'$';
pub const CHECKSUM: u8 = b'*';

const DIGITS: usize = 2;
const READ_BUF: usize = 4096;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrameState {
    #[default]
    Idle,
    Capturing,
    AwaitingChecksum,
}

/// What a byte means in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Noise outside a frame.
    Ignore,
    /// `$`: drop whatever is in progress and start a new frame.
    Start,
    /// A payload byte.
    Payload,
    /// `*` ending the payload.
    ChecksumMarker,
    /// One of the two checksum digits. A `*` here counts as a digit.
    Digit,
}

impl FrameState {
    /// Classifies `byte` in this state. Defined for every state and byte.
    pub fn step(self, byte: u8) -> Step {
        match (self, byte) {
            (_, START) => Step::Start,
            (FrameState::Idle, _) => Step::Ignore,
            (FrameState::Capturing, CHECKSUM) => Step::ChecksumMarker,
            (FrameState::Capturing, _) => Step::Payload,
            (FrameState::AwaitingChecksum, _) => Step::Digit,
        }
    }
}

/// Cumulative counters over the parser's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserStats {
    pub validated: u64,
    pub mismatched: u64,
    /// Frames abandoned before their checksum, either restarted by `$` or cut
    /// off at a chunk boundary.
    pub discarded: u64,
}

#[derive(Debug)]
pub struct FrameParser {
    state: FrameState,
    payload: Vec<u8>,
    digest: u8,
    digits: [u8; DIGITS],
    digit_len: usize,
    chunk_mode: ChunkMode,
    checksum_case: ChecksumCase,
    encoding: PayloadEncoding,
    stats: ParserStats,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl FrameParser {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            state: FrameState::Idle,
            payload: Vec::with_capacity(128),
            digest: 0,
            digits: [0; DIGITS],
            digit_len: 0,
            chunk_mode: config.chunk_mode,
            checksum_case: config.checksum_case,
            encoding: config.encoding,
            stats: ParserStats::default(),
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    pub fn chunk_mode(&self) -> ChunkMode {
        self.chunk_mode
    }

    /// Abandons any frame in progress and returns to idle.
    pub fn reset(&mut self) {
        if self.state != FrameState::Idle {
            self.discard("reset");
        }
        self.state = FrameState::Idle;
    }

    /// Feeds one byte. Returns the payload when this byte completes a frame
    /// whose checksum matches.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        match self.state.step(byte) {
            Step::Ignore => None,
            Step::Start => {
                if self.state != FrameState::Idle {
                    self.discard("restarted by '$'");
                }
                self.payload.clear();
                self.digest = 0;
                self.digit_len = 0;
                self.state = FrameState::Capturing;
                None
            }
            Step::Payload => {
                self.payload.push(byte);
                self.digest ^= byte;
                None
            }
            Step::ChecksumMarker => {
                self.digit_len = 0;
                self.state = FrameState::AwaitingChecksum;
                None
            }
            Step::Digit => {
                self.digits[self.digit_len] = byte;
                self.digit_len += 1;
                if self.digit_len < DIGITS {
                    return None;
                }
                self.state = FrameState::Idle;
                self.verify()
            }
        }
    }

    /// Parses one submitted chunk, handing every validated payload to `emit`
    /// in order. Returns the number of frames validated by this call.
    pub fn parse(&mut self, bytes: &[u8], mut emit: impl FnMut(String)) -> u64 {
        let before = self.stats.validated;
        self.enter_chunk();
        for &b in bytes {
            if let Some(payload) = self.push(b) {
                emit(payload);
            }
        }
        self.leave_chunk();
        self.stats.validated - before
    }

    /// Like [`parse`](Self::parse), with everything `reader` yields up to end
    /// of input treated as one chunk. A read failure aborts the chunk and is
    /// returned together with the frames validated so far.
    pub fn parse_reader<R: Read>(&mut self, mut reader: R, mut emit: impl FnMut(String)) -> Result<u64> {
        let before = self.stats.validated;
        let mut buf = [0u8; READ_BUF];
        self.enter_chunk();
        let outcome = loop {
            match reader.read(&mut buf) {
                Ok(0) => break Ok(()),
                Ok(n) => {
                    for &b in &buf[..n] {
                        if let Some(payload) = self.push(b) {
                            emit(payload);
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => break Err(e),
            }
        };
        self.leave_chunk();

        let frames = self.stats.validated - before;
        outcome
            .map(|()| frames)
            .map_err(|source| Error::Source { frames, source })
    }

    fn enter_chunk(&mut self) {
        if self.chunk_mode == ChunkMode::ResetPerChunk {
            self.reset();
        }
    }

    fn leave_chunk(&mut self) {
        if self.chunk_mode == ChunkMode::ResetPerChunk {
            self.reset();
        }
    }

    fn verify(&mut self) -> Option<String> {
        let expected = render_digest(self.digest).to_ascii_uppercase();
        let received = match self.checksum_case {
            ChecksumCase::Strict => self.digits,
            ChecksumCase::Insensitive => self.digits.map(|b| b.to_ascii_uppercase()),
        };

        if expected.as_bytes() == &received[..] {
            self.stats.validated += 1;
            Some(self.encoding.decode(&self.payload))
        } else {
            self.stats.mismatched += 1;
            debug!(
                "checksum mismatch: computed {expected}, received {:?}",
                String::from_utf8_lossy(&self.digits)
            );
            None
        }
    }

    fn discard(&mut self, why: &str) {
        self.stats.discarded += 1;
        trace!("discarding partial frame ({why}): {} payload bytes", self.payload.len());
    }
}
