//! # Frame Sinks
//!
//! Consumers of decoded frames.
//!
//! This module handles:
//! - The [`FrameSink`] capability the reader dispatches to
//! - Plain text output, one frame per line
//! - JSON Lines output with a timestamp per frame

use std::io::Write;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::sbus::protocol::DecodedFrame;

/// Receives every successfully decoded frame
///
/// Errors returned here are not handled by the reader: they end the run.
#[cfg_attr(test, mockall::automock)]
pub trait FrameSink {
    fn process(&mut self, frame: &DecodedFrame) -> anyhow::Result<()>;
}

impl<F> FrameSink for F
where
    F: FnMut(&DecodedFrame) -> anyhow::Result<()>,
{
    fn process(&mut self, frame: &DecodedFrame) -> anyhow::Result<()> {
        self(frame)
    }
}

/// Writes each frame using its `Display` form
#[derive(Debug)]
pub struct TextSink<W> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FrameSink for TextSink<W> {
    fn process(&mut self, frame: &DecodedFrame) -> anyhow::Result<()> {
        writeln!(self.out, "{}", frame)?;
        Ok(())
    }
}

/// One JSON Lines record
#[derive(Debug, Serialize)]
struct FrameRecord<'a> {
    timestamp: String,
    #[serde(flatten)]
    frame: &'a DecodedFrame,
}

/// Writes each frame as a JSON object on its own line
///
/// ```text
/// {"timestamp":"2024-01-01T00:00:00.000Z","channels":[992,1100],"failsafe":false,...}
/// ```
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FrameSink for JsonLinesSink<W> {
    fn process(&mut self, frame: &DecodedFrame) -> anyhow::Result<()> {
        let record = FrameRecord {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            frame,
        };
        serde_json::to_writer(&mut self.out, &record)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}
