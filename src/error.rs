//! # Error Types
//!
//! Custom error types for rfrx using `thiserror`.

use thiserror::Error;

/// Per-frame validation failure reported by the SBUS decoder
///
/// Each variant carries the expected and the received value so a log line is
/// enough to diagnose a desynchronized stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Frame is not exactly 25 bytes long
    #[error("Wrong frame length. Expected {expected}, got {actual}.")]
    WrongLength { expected: usize, actual: usize },

    /// First byte is not the SBUS header
    #[error("Wrong header. Expected 0x{expected:02X}, got 0x{actual:02X}.")]
    WrongHeader { expected: u8, actual: u8 },

    /// Last byte is not the SBUS end marker
    #[error("Wrong end byte. Expected 0x{expected:02X}, got 0x{actual:02X}.")]
    WrongEndByte { expected: u8, actual: u8 },
}

/// Main error type for rfrx
#[derive(Debug, Error)]
pub enum RfrxError {
    /// SBUS frame validation errors
    #[error("SBUS error: {0}")]
    Decode(#[from] DecodeError),

    /// Decoder constructed with an unusable channel count
    #[error("Wrong number of channels. Expected 0 <= n_chans <= 16, got {0}.")]
    ChannelCount(i64),

    /// A consumer needs more channels than the decoder produces
    #[error("Not enough channels: need {needed}, frame has {actual}")]
    NotEnoughChannels { needed: usize, actual: usize },

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame sink refused a frame; fatal to the read loop
    #[error("Frame sink error: {0}")]
    Sink(#[source] anyhow::Error),
}

/// Result type alias for rfrx
pub type Result<T> = std::result::Result<T, RfrxError>;
