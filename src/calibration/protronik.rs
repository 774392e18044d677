//! # Pro-Tronik PTR-6A v2 Mapping
//!
//! Interprets the six channels sent by a Pro-Tronik PTR-6A v2 remote.
//!
//! | Channel | Input | Output |
//! |---------|-------|--------|
//! | CH1 | Right stick horizontal | `rh`, -1.0 (left) to 1.0 (right) |
//! | CH2 | Right stick vertical | `rv`, inverted |
//! | CH3 | Left stick vertical | `lv`, inverted |
//! | CH4 | Left stick horizontal | `lh` |
//! | CH5 | 3-position switch | `ch5`: 2, 1 or 0 |
//! | CH6 | 2-position switch | `ch6`: 0 or 1 |
//!
//! The receiver's signal must be inverted before it reaches the UART.

use std::fmt;
use std::io::Write;

use serde::Deserialize;

use super::AxisRange;
use crate::error::{RfrxError, Result};
use crate::sbus::protocol::DecodedFrame;
use crate::sink::FrameSink;

/// Number of channels the remote uses
pub const PROTRONIK_CHANNELS: usize = 6;

/// Channel indices for semantic access.
pub mod channels {
    /// Right stick horizontal
    pub const RIGHT_HORIZONTAL: usize = 0;
    /// Right stick vertical
    pub const RIGHT_VERTICAL: usize = 1;
    /// Left stick vertical
    pub const LEFT_VERTICAL: usize = 2;
    /// Left stick horizontal
    pub const LEFT_HORIZONTAL: usize = 3;
    /// 3-position switch
    pub const SWITCH_3POS: usize = 4;
    /// 2-position switch
    pub const SWITCH_2POS: usize = 5;
}

/// 3-position switch thresholds
const SWITCH_3POS_LOW: u16 = 500;
const SWITCH_3POS_HIGH: u16 = 1500;

/// 2-position switch threshold
const SWITCH_2POS_THRESHOLD: u16 = 1000;

/// Per-axis calibration of the four sticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProTronikCalibration {
    pub rh: AxisRange,
    pub rv: AxisRange,
    pub lv: AxisRange,
    pub lh: AxisRange,
}

impl Default for ProTronikCalibration {
    fn default() -> Self {
        Self {
            rh: AxisRange::new(192, 992, 1796),
            rv: AxisRange::new(302, 1100, 1900),
            lv: AxisRange::new(180, 980, 1779),
            lh: AxisRange::new(192, 992, 1790),
        }
    }
}

impl ProTronikCalibration {
    /// Validate every axis
    ///
    /// # Errors
    ///
    /// Returns the first invalid axis, named
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, axis) in [("rh", self.rh), ("rv", self.rv), ("lv", self.lv), ("lh", self.lh)] {
            axis.validate().map_err(|e| format!("calibration.{}: {}", name, e))?;
        }
        Ok(())
    }

    /// Map a decoded frame to stick and switch positions
    ///
    /// # Errors
    ///
    /// Returns `RfrxError::NotEnoughChannels` if the frame carries fewer than
    /// six channels
    pub fn apply(&self, frame: &DecodedFrame) -> Result<ProTronikState> {
        let ch = &frame.channels;
        if ch.len() < PROTRONIK_CHANNELS {
            return Err(RfrxError::NotEnoughChannels {
                needed: PROTRONIK_CHANNELS,
                actual: ch.len(),
            });
        }

        let switch_3pos = ch[channels::SWITCH_3POS];
        let ch5 = if switch_3pos < SWITCH_3POS_LOW {
            2
        } else if switch_3pos < SWITCH_3POS_HIGH {
            1
        } else {
            0
        };
        let ch6 = u8::from(ch[channels::SWITCH_2POS] >= SWITCH_2POS_THRESHOLD);

        Ok(ProTronikState {
            rh: self.rh.scale(ch[channels::RIGHT_HORIZONTAL]),
            rv: -self.rv.scale(ch[channels::RIGHT_VERTICAL]),
            lv: -self.lv.scale(ch[channels::LEFT_VERTICAL]),
            lh: self.lh.scale(ch[channels::LEFT_HORIZONTAL]),
            ch5,
            ch6,
        })
    }
}

/// Stick and switch positions of the remote
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProTronikState {
    /// Right stick horizontal, -1.0 to 1.0
    pub rh: f64,
    /// Right stick vertical, -1.0 to 1.0
    pub rv: f64,
    /// Left stick vertical, -1.0 to 1.0
    pub lv: f64,
    /// Left stick horizontal, -1.0 to 1.0
    pub lh: f64,
    /// 3-position switch: 2, 1 or 0
    pub ch5: u8,
    /// 2-position switch: 0 or 1
    pub ch6: u8,
}

impl fmt::Display for ProTronikState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:+.3} {:+.3} {:+.3} {:+.3} {} {}",
            self.rh, self.rv, self.lv, self.lh, self.ch5, self.ch6
        )
    }
}

/// Prints the calibrated state of each frame
#[derive(Debug)]
pub struct ProTronikSink<W> {
    calibration: ProTronikCalibration,
    out: W,
}

impl<W: Write> ProTronikSink<W> {
    pub fn new(calibration: ProTronikCalibration, out: W) -> Self {
        Self { calibration, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FrameSink for ProTronikSink<W> {
    fn process(&mut self, frame: &DecodedFrame) -> anyhow::Result<()> {
        let state = self.calibration.apply(frame)?;
        writeln!(self.out, "{}", state)?;
        Ok(())
    }
}
