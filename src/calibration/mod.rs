//! # Calibration Module
//!
//! Converts raw SBUS channel values into normalized stick positions.
//!
//! Each axis is described by the raw values seen at the stick's minimum,
//! center and maximum. The two halves of the travel are scaled separately, so
//! an off-center trim still maps the resting position to exactly 0.0:
//!
//! ```text
//! raw:     min ........ mid ........ max
//! output: -1.0 ........ 0.0 ........ 1.0
//! ```
//!
//! Values beyond `min`/`max` saturate at -1.0/1.0.
//!
//! ## Usage
//!
//! ```
//! use rfrx::calibration::AxisRange;
//!
//! let axis = AxisRange::new(192, 992, 1792);
//! assert_eq!(axis.scale(992), 0.0);
//! assert_eq!(axis.scale(1792), 1.0);
//! assert_eq!(axis.scale(100), -1.0);
//! ```

pub mod protronik;

use serde::Deserialize;
use tracing::debug;

use crate::sbus::protocol::SBUS_CHANNEL_VALUE_MAX;

/// Raw channel values at the ends and center of one stick axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AxisRange {
    pub min: u16,
    pub mid: u16,
    pub max: u16,
}

impl AxisRange {
    #[must_use]
    pub const fn new(min: u16, mid: u16, max: u16) -> Self {
        Self { min, mid, max }
    }

    /// Check `min < mid < max <= 2047`
    ///
    /// # Errors
    ///
    /// Returns a description of the violated ordering
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.min >= self.mid || self.mid >= self.max {
            return Err(format!(
                "axis range must satisfy min < mid < max, got {} / {} / {}",
                self.min, self.mid, self.max
            ));
        }
        if self.max > SBUS_CHANNEL_VALUE_MAX {
            return Err(format!(
                "axis max {} exceeds channel maximum {}",
                self.max, SBUS_CHANNEL_VALUE_MAX
            ));
        }
        Ok(())
    }

    /// Scale a raw channel value to -1.0..=1.0
    #[must_use]
    pub fn scale(&self, raw: u16) -> f64 {
        if raw < self.min {
            debug!("value lower than min: {} < {}", raw, self.min);
            return -1.0;
        }
        if raw > self.max {
            debug!("value higher than max: {} > {}", raw, self.max);
            return 1.0;
        }

        let raw = f64::from(raw);
        let (min, mid, max) = (f64::from(self.min), f64::from(self.mid), f64::from(self.max));
        if raw < mid {
            (raw - min) / (mid - min) - 1.0
        } else {
            (raw - mid) / (max - mid)
        }
    }
}
