//! # Serial Communication Module
//!
//! Handles the serial link to the SBUS receiver.
//!
//! This module handles:
//! - Opening the serial port at 100,000 baud, 8 data bits, 2 stop bits
//! - Configurable parity (SBUS nominally uses even parity)
//! - Timed reads of fixed-size frames

pub mod port_trait;

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{RfrxError, Result};
use crate::sbus::protocol::SBUS_BAUD_RATE;
use port_trait::{PortOpener, TimedReader};

/// Default SBUS device path (Raspberry Pi mini UART)
pub const DEFAULT_DEVICE_PATH: &str = "/dev/ttyS0";

/// Parity setting for the serial line
///
/// SBUS specifies even parity. Some host drivers misbehave with it enabled
/// (seen on Raspbian buster with certain pyserial releases), so `None` is
/// available as a host-specific workaround.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ParitySetting {
    #[default]
    Even,
    Odd,
    None,
}

impl From<ParitySetting> for tokio_serial::Parity {
    fn from(parity: ParitySetting) -> Self {
        match parity {
            ParitySetting::Even => tokio_serial::Parity::Even,
            ParitySetting::Odd => tokio_serial::Parity::Odd,
            ParitySetting::None => tokio_serial::Parity::None,
        }
    }
}

/// Everything needed to open one reader session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSettings {
    /// Device path (e.g., /dev/ttyS0)
    pub path: String,
    /// Line parity
    pub parity: ParitySetting,
    /// Maximum time a single frame read may block
    pub timeout: Duration,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            path: DEFAULT_DEVICE_PATH.to_string(),
            parity: ParitySetting::default(),
            timeout: Duration::from_secs(1),
        }
    }
}

/// Serial port wrapper used by the reader
pub type SbusSerialPort = TimedReader<tokio_serial::SerialStream>;

/// Opens real serial ports with SBUS line settings
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialOpener;

impl PortOpener for SerialOpener {
    type Port = SbusSerialPort;

    fn open(&mut self, settings: &PortSettings) -> Result<SbusSerialPort> {
        debug!("Trying to open serial port: {}", settings.path);
        let stream = open_port(settings)?;
        info!(
            "Opened SBUS device at {} ({} baud, parity {:?})",
            settings.path, SBUS_BAUD_RATE, settings.parity
        );
        Ok(TimedReader::new(stream, settings.timeout))
    }
}

/// Open a specific serial port with SBUS settings
///
/// # Arguments
///
/// * `settings` - Device path, parity and read timeout
///
/// # Returns
///
/// * `Result<SerialStream>` - Opened serial port
fn open_port(settings: &PortSettings) -> Result<tokio_serial::SerialStream> {
    use tokio_serial::SerialPortBuilderExt;

    let port = tokio_serial::new(&settings.path, SBUS_BAUD_RATE)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(settings.parity.into())
        .stop_bits(tokio_serial::StopBits::Two)
        .flow_control(tokio_serial::FlowControl::None)
        .timeout(settings.timeout)
        .open_native_async()
        .map_err(|e| RfrxError::Serial(format!("Failed to open {}: {}", settings.path, e)))?;

    Ok(port)
}
