//! # SBUS Protocol Module
//!
//! Implementation of the SBUS (Serial Bus) receiver protocol.
//!
//! This module handles:
//! - Frame validation (length, header, end byte)
//! - Unpacking 16 channels of 11 bits each
//! - Status flags (failsafe, frame lost, digital channels 17/18)

pub mod protocol;
pub mod decoder;
pub mod encoder;
