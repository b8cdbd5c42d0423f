use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The byte source failed before end of input. `frames` is how many
    /// frames were validated during the call before the failure.
    #[error("byte source failed after {frames} frames: {source}")]
    Source {
        frames: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("invalid {name}: {value:?}")]
    InvalidOption { name: &'static str, value: String },

    #[error("feed disconnected")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, Error>;
