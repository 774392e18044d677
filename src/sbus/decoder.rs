//! # SBUS Frame Decoder
//!
//! Validates 25-byte SBUS frames and unpacks their channels and flags.

use super::protocol::*;
use crate::error::{DecodeError, RfrxError, Result};
use tracing::debug;

/// Mask for one 11-bit channel
const CHANNEL_MASK: u32 = (1 << SBUS_CHANNEL_BITS) - 1;

/// Stateless SBUS frame decoder
///
/// The channel count is validated once, at construction. Decoding is a pure
/// function of the input bytes, so a decoder can be copied freely and shared
/// between call sites.
///
/// # Examples
///
/// ```
/// use rfrx::sbus::decoder::FrameDecoder;
///
/// let decoder = FrameDecoder::new(6)?;
/// let mut frame = [0u8; 25];
/// frame[0] = 0x0F;
/// let decoded = decoder.decode(&frame)?;
/// assert_eq!(decoded.channels, vec![0; 6]);
/// # Ok::<(), rfrx::error::RfrxError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDecoder {
    n_chans: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self {
            n_chans: SBUS_MAX_CHANNELS,
        }
    }
}

impl FrameDecoder {
    /// Create a decoder that keeps the first `n_chans` channels
    ///
    /// # Errors
    ///
    /// Returns `RfrxError::ChannelCount` if `n_chans` is greater than 16
    pub fn new(n_chans: usize) -> Result<Self> {
        if n_chans > SBUS_MAX_CHANNELS {
            return Err(RfrxError::ChannelCount(
                i64::try_from(n_chans).unwrap_or(i64::MAX),
            ));
        }
        Ok(Self { n_chans })
    }

    /// Number of channels produced per frame
    pub fn n_chans(&self) -> usize {
        self.n_chans
    }

    /// Validate and decode one frame
    ///
    /// Checks run in order: length, header, end byte. The first failing
    /// check is reported.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] describing the first check that failed
    pub fn decode(&self, frame: &[u8]) -> std::result::Result<DecodedFrame, DecodeError> {
        check_frame(frame)?;

        let payload = &frame[SBUS_CHANNELS_OFFSET..SBUS_FLAGS_OFFSET];
        let channels = unpack_channels(payload, self.n_chans);
        let flags = frame[SBUS_FLAGS_OFFSET];

        let decoded = DecodedFrame {
            channels,
            failsafe: flags & SBUS_FLAG_FAILSAFE != 0,
            frame_lost: flags & SBUS_FLAG_FRAME_LOST != 0,
            ch17: flags & SBUS_FLAG_CH17 != 0,
            ch18: flags & SBUS_FLAG_CH18 != 0,
        };

        debug!(
            channels = ?decoded.channels,
            failsafe = decoded.failsafe,
            frame_lost = decoded.frame_lost,
            ch17 = decoded.ch17,
            ch18 = decoded.ch18,
            "Decoded SBUS frame"
        );

        Ok(decoded)
    }
}

impl TryFrom<i64> for FrameDecoder {
    type Error = RfrxError;

    /// Build a decoder from a signed count, as read from configuration
    fn try_from(n_chans: i64) -> Result<Self> {
        match usize::try_from(n_chans) {
            Ok(n) if n <= SBUS_MAX_CHANNELS => Ok(Self { n_chans: n }),
            _ => Err(RfrxError::ChannelCount(n_chans)),
        }
    }
}

/// Check frame length, header and end byte
fn check_frame(frame: &[u8]) -> std::result::Result<(), DecodeError> {
    if frame.len() != SBUS_FRAME_LEN {
        return Err(DecodeError::WrongLength {
            expected: SBUS_FRAME_LEN,
            actual: frame.len(),
        });
    }

    if frame[0] != SBUS_HEADER_BYTE {
        return Err(DecodeError::WrongHeader {
            expected: SBUS_HEADER_BYTE,
            actual: frame[0],
        });
    }

    let end = frame[SBUS_FRAME_LEN - 1];
    if end != SBUS_END_BYTE {
        return Err(DecodeError::WrongEndByte {
            expected: SBUS_END_BYTE,
            actual: end,
        });
    }

    Ok(())
}

/// Unpack the first `count` 11-bit channels from the 22-byte channel block
///
/// The block is a little-endian bitstream: channel 0 occupies bits 0..11,
/// channel 1 bits 11..22, and so on.
///
/// ```text
/// Byte 0: Ch1[0:7]
/// Byte 1: Ch1[8:10] | Ch2[0:4]
/// Byte 2: Ch2[5:10] | Ch3[0:1]
/// ...
/// ```
fn unpack_channels(payload: &[u8], count: usize) -> Vec<u16> {
    let mut channels = Vec::with_capacity(count);
    let mut acc: u32 = 0;
    let mut acc_bits: u32 = 0;
    let mut bytes = payload.iter();

    while channels.len() < count {
        // 16 x 11 bits is exactly 176 bits, so the payload never runs dry
        while acc_bits < SBUS_CHANNEL_BITS {
            let Some(&byte) = bytes.next() else { break };
            acc |= u32::from(byte) << acc_bits;
            acc_bits += 8;
        }

        channels.push((acc & CHANNEL_MASK) as u16);
        acc >>= SBUS_CHANNEL_BITS;
        acc_bits = acc_bits.saturating_sub(SBUS_CHANNEL_BITS);
    }

    channels
}
