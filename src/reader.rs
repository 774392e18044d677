//! # SBUS Frame Reader
//!
//! Continuous read loop binding the decoder to a serial port.
//!
//! The loop is a two-level state machine:
//!
//! - **Session loop**: open the port, run the frame loop, close the port, back
//!   off, reopen. Repeats while the reader is running and retry is enabled.
//! - **Frame loop**: read 25 bytes, decode, dispatch to the sink. Ends the
//!   session on a malformed frame (the stream is out of sync) or a transport
//!   error. An empty read (timeout) only logs a warning.
//!
//! Only sink errors escape [`FrameReader::run`]; every per-frame fault is
//! contained in the frame loop.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{DecodeError, RfrxError, Result};
use crate::sbus::decoder::FrameDecoder;
use crate::sbus::protocol::SBUS_FRAME_LEN;
use crate::serial::port_trait::{FramePort, PortOpener};
use crate::serial::PortSettings;
use crate::sink::FrameSink;

/// Default pause between sessions
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Shared cooperative stop switch
///
/// Checked at the top of every session and every frame read. A read already
/// in progress finishes (or times out) before a stop is observed.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new(running: bool) -> Self {
        Self(Arc::new(AtomicBool::new(running)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Reader settings
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Port to open for each session
    pub port: PortSettings,
    /// Reopen the port after a session failure
    pub retry: bool,
    /// Pause between sessions
    pub backoff: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            port: PortSettings::default(),
            retry: true,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

/// Why a session ended
#[derive(Debug)]
enum SessionEnd {
    /// Run flag was cleared
    Stopped,
    /// Malformed or short frame; the stream is out of sync
    Desync(DecodeError),
    /// The port failed while reading
    Transport(io::Error),
}

/// Counters for one [`FrameReader::run`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Sessions successfully opened
    pub sessions: u64,
    /// Failed attempts to open the port
    pub open_failures: u64,
    /// Frames handed to the sink
    pub frames: u64,
    /// Reads that returned no data before the timeout
    pub empty_reads: u64,
    /// Frames rejected by the decoder
    pub decode_errors: u64,
    /// Reads that failed at the transport level
    pub transport_errors: u64,
}

/// Reads SBUS frames from a port and dispatches them to a sink
///
/// # Examples
///
/// ```no_run
/// use rfrx::reader::{FrameReader, ReaderConfig, RunFlag};
/// use rfrx::sbus::decoder::FrameDecoder;
/// use rfrx::serial::SerialOpener;
/// use rfrx::sink::TextSink;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> anyhow::Result<()> {
///     let mut reader = FrameReader::new(
///         SerialOpener,
///         FrameDecoder::default(),
///         TextSink::new(std::io::stdout()),
///         ReaderConfig::default(),
///         RunFlag::default(),
///     );
///     reader.run().await?;
///     Ok(())
/// }
/// ```
pub struct FrameReader<O, S> {
    opener: O,
    decoder: FrameDecoder,
    sink: S,
    config: ReaderConfig,
    running: RunFlag,
    stats: ReaderStats,
}

impl<O, S> FrameReader<O, S>
where
    O: PortOpener,
    S: FrameSink,
{
    pub fn new(
        opener: O,
        decoder: FrameDecoder,
        sink: S,
        config: ReaderConfig,
        running: RunFlag,
    ) -> Self {
        Self {
            opener,
            decoder,
            sink,
            config,
            running,
            stats: ReaderStats::default(),
        }
    }

    /// Counters so far; also returned by [`run`](Self::run)
    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Run the session loop until stopped
    ///
    /// Returns when the run flag is cleared, or after the first failed session
    /// if retry is disabled.
    ///
    /// # Errors
    ///
    /// Returns `RfrxError::Sink` if the sink rejects a frame. Decode and
    /// transport errors are logged and never returned.
    pub async fn run(&mut self) -> Result<ReaderStats> {
        while self.running.is_running() {
            match self.opener.open(&self.config.port) {
                Ok(mut port) => {
                    self.stats.sessions += 1;
                    let end = self.run_session(&mut port).await?;
                    drop(port);
                    debug!("Closed {}", self.config.port.path);

                    match end {
                        SessionEnd::Stopped => break,
                        SessionEnd::Desync(e) => {
                            self.stats.decode_errors += 1;
                            error!("SBUS error: {}", e);
                        }
                        SessionEnd::Transport(e) => {
                            self.stats.transport_errors += 1;
                            error!("Read from {} failed: {}", self.config.port.path, e);
                        }
                    }
                }
                Err(e) => {
                    self.stats.open_failures += 1;
                    error!("Cannot open {}: {}", self.config.port.path, e);
                }
            }

            if !self.config.retry || !self.running.is_running() {
                break;
            }

            warn!(
                "Sleeping {:?} before reopening {}",
                self.config.backoff, self.config.port.path
            );
            tokio::time::sleep(self.config.backoff).await;
        }

        info!(
            sessions = self.stats.sessions,
            frames = self.stats.frames,
            "SBUS reader stopped"
        );
        Ok(self.stats)
    }

    /// Frame loop for one open port
    async fn run_session(&mut self, port: &mut O::Port) -> Result<SessionEnd> {
        let mut buf = [0u8; SBUS_FRAME_LEN];

        while self.running.is_running() {
            let n = match port.read_frame(&mut buf).await {
                Ok(n) => n,
                Err(e) => return Ok(SessionEnd::Transport(e)),
            };

            if n == 0 {
                self.stats.empty_reads += 1;
                warn!(
                    "No data on {} in the last {:?}",
                    self.config.port.path, self.config.port.timeout
                );
                continue;
            }

            // Short reads fall through to the length check
            let frame = match self.decoder.decode(&buf[..n]) {
                Ok(frame) => frame,
                Err(e) => return Ok(SessionEnd::Desync(e)),
            };

            self.sink.process(&frame).map_err(RfrxError::Sink)?;
            self.stats.frames += 1;
        }

        Ok(SessionEnd::Stopped)
    }
}
