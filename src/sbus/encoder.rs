//! # SBUS Frame Encoder
//!
//! Packs channel values and flags into a 25-byte SBUS frame. Used to build
//! wire-exact test frames for the decoder and the reader.

use super::protocol::*;

/// Encode a decoded frame back into wire bytes
///
/// Missing channels (fewer than 16) are sent as 0. Values above 2047 are
/// clamped.
///
/// # Examples
///
/// ```
/// use rfrx::sbus::encoder::encode_frame;
/// use rfrx::sbus::protocol::DecodedFrame;
///
/// let frame = DecodedFrame {
///     channels: vec![992; 16],
///     failsafe: false,
///     frame_lost: false,
///     ch17: false,
///     ch18: false,
/// };
/// let bytes = encode_frame(&frame);
/// assert_eq!(bytes[0], 0x0F);
/// assert_eq!(bytes[24], 0x00);
/// ```
pub fn encode_frame(frame: &DecodedFrame) -> RawFrame {
    let mut raw = [0u8; SBUS_FRAME_LEN];
    raw[0] = SBUS_HEADER_BYTE;

    let payload = &mut raw[SBUS_CHANNELS_OFFSET..SBUS_FLAGS_OFFSET];
    let mut bit_index = 0;

    for &channel in frame.channels.iter().take(SBUS_MAX_CHANNELS) {
        let value = clamp_channel_value(channel);

        for bit in 0..SBUS_CHANNEL_BITS {
            if (value >> bit) & 1 == 1 {
                payload[bit_index / 8] |= 1 << (bit_index % 8);
            }
            bit_index += 1;
        }
    }

    let mut flags = 0u8;
    if frame.failsafe {
        flags |= SBUS_FLAG_FAILSAFE;
    }
    if frame.frame_lost {
        flags |= SBUS_FLAG_FRAME_LOST;
    }
    if frame.ch17 {
        flags |= SBUS_FLAG_CH17;
    }
    if frame.ch18 {
        flags |= SBUS_FLAG_CH18;
    }
    raw[SBUS_FLAGS_OFFSET] = flags;
    raw[SBUS_FRAME_LEN - 1] = SBUS_END_BYTE;

    raw
}

/// Clamp a channel value to the 11-bit range (0-2047)
fn clamp_channel_value(value: u16) -> u16 {
    value.min(SBUS_CHANNEL_VALUE_MAX)
}
