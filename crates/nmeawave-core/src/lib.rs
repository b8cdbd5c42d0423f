//! Core functionalities: frame detection, the decode pipeline, serial feed.

pub mod config;
pub mod encoding;
pub mod error;
pub mod frame_parser;
pub mod line_buffer;
pub mod pipeline;
pub mod serial_feed;

pub use config::{ChecksumCase, ChunkMode, PipelineConfig, DEFAULT_QUEUE_CAPACITY};
pub use encoding::PayloadEncoding;
pub use error::{Error, Result};
pub use frame_parser::{FrameParser, FrameState, ParserStats, Step};
pub use line_buffer::LineAssembler;
pub use pipeline::Pipeline;
pub use serial_feed::{FeedEvent, FeedStats, PortInfo, SerialConfig, SerialFeed};

pub use nmeawave_decode::{checksum, frame, Sentence};
