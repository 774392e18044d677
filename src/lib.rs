//! # rfrx Library
//!
//! Decode SBUS frames from an RC receiver and keep reading them over a serial
//! line that may drop out.
//!
//! This library provides the SBUS frame decoder, a resilient read loop with
//! reconnect/backoff, frame sinks, and stick calibration for the Pro-Tronik
//! PTR-6A v2 remote.

pub mod config;
pub mod error;
pub mod sbus;
pub mod serial;
pub mod reader;
pub mod sink;
pub mod calibration;
