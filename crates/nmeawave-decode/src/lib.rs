//! Sentence-level building blocks: the XOR checksum and the generic sentence record.

pub mod checksum;
pub mod sentence;

pub use checksum::{checksum, frame, render_digest, xor_digest};
pub use sentence::Sentence;
