//! # SBUS Protocol Constants and Types
//!
//! Core protocol definitions for SBUS frames.
//!
//! ```text
//! | Offset | Size | Meaning                                           |
//! |--------|------|---------------------------------------------------|
//! | 0      | 1    | header, 0x0F                                      |
//! | 1-22   | 22   | 16 x 11-bit channels, little-endian, LSB first    |
//! | 23     | 1    | flags: 0x10 failsafe, 0x20 lost, 0x40 ch18, 0x80 ch17 |
//! | 24     | 1    | end marker, 0x00                                  |
//! ```

use serde::Serialize;
use std::fmt;

/// SBUS frame length in bytes
pub const SBUS_FRAME_LEN: usize = 25;

/// SBUS header byte (always 0x0F)
pub const SBUS_HEADER_BYTE: u8 = 0x0F;

/// SBUS end marker (always 0x00)
pub const SBUS_END_BYTE: u8 = 0x00;

/// Offset of the first channel byte
pub const SBUS_CHANNELS_OFFSET: usize = 1;

/// Packed channel block size (16 channels x 11 bits = 176 bits)
pub const SBUS_CHANNELS_PAYLOAD_SIZE: usize = 22;

/// Offset of the flags byte
pub const SBUS_FLAGS_OFFSET: usize = 23;

/// Maximum number of proportional channels in a frame
pub const SBUS_MAX_CHANNELS: usize = 16;

/// Bits per channel
pub const SBUS_CHANNEL_BITS: u32 = 11;

/// Channel value range (11-bit: 0-2047)
pub const SBUS_CHANNEL_VALUE_MIN: u16 = 0;
pub const SBUS_CHANNEL_VALUE_MAX: u16 = 2047;

/// Flag bits in byte 23
pub const SBUS_FLAG_FAILSAFE: u8 = 0x10;
pub const SBUS_FLAG_FRAME_LOST: u8 = 0x20;
pub const SBUS_FLAG_CH18: u8 = 0x40;
pub const SBUS_FLAG_CH17: u8 = 0x80;

/// SBUS line settings: 100,000 baud, 8 data bits, 2 stop bits
pub const SBUS_BAUD_RATE: u32 = 100_000;

/// Raw SBUS frame bytes
pub type RawFrame = [u8; SBUS_FRAME_LEN];

/// A validated and unpacked SBUS frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedFrame {
    /// The first `n_chans` channel values, each in 0..=2047
    pub channels: Vec<u16>,

    /// Receiver lost its uplink and substitutes failsafe values
    pub failsafe: bool,

    /// A radio packet was missed; channel data may be stale
    pub frame_lost: bool,

    /// Digital channel 17
    pub ch17: bool,

    /// Digital channel 18
    pub ch18: bool,
}

impl fmt::Display for DecodedFrame {
    /// Channels right-aligned on 4 columns, then failsafe, frame lost,
    /// ch18 and ch17 as 0/1
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [self.failsafe, self.frame_lost, self.ch18, self.ch17];
        let mut first = true;
        for value in self
            .channels
            .iter()
            .copied()
            .chain(flags.iter().map(|&flag| u16::from(flag)))
        {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{:4}", value)?;
            first = false;
        }
        Ok(())
    }
}
