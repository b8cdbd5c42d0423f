use std::str::FromStr;

use crate::{Error, PayloadEncoding};

/// Capacity of each pipeline queue unless configured otherwise.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Whether chunk boundaries are significant to frame detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChunkMode {
    /// Parser state is forced to idle before and after every submitted chunk,
    /// so a frame must start and end within one chunk. Suits sources that hand
    /// over one line per read.
    #[default]
    ResetPerChunk,
    /// Parser state survives between submissions and a frame may span chunks.
    CarryOver,
}

impl FromStr for ChunkMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reset" | "reset-per-chunk" => Ok(Self::ResetPerChunk),
            "carry" | "carry-over" => Ok(Self::CarryOver),
            _ => Err(Error::InvalidOption {
                name: "chunk mode",
                value: s.to_string(),
            }),
        }
    }
}

/// How the two received checksum digits are compared to the computed digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChecksumCase {
    /// Received digits must be upper-case hex, compared verbatim.
    #[default]
    Strict,
    /// Received digits are upper-cased before comparison.
    Insensitive,
}

impl FromStr for ChecksumCase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "insensitive" | "ignore-case" => Ok(Self::Insensitive),
            _ => Err(Error::InvalidOption {
                name: "checksum case",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub raw_capacity: usize,
    pub output_capacity: usize,
    pub chunk_mode: ChunkMode,
    pub checksum_case: ChecksumCase,
    pub encoding: PayloadEncoding,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_capacity: DEFAULT_QUEUE_CAPACITY,
            output_capacity: DEFAULT_QUEUE_CAPACITY,
            chunk_mode: ChunkMode::default(),
            checksum_case: ChecksumCase::default(),
            encoding: PayloadEncoding::default(),
        }
    }
}
