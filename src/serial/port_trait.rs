//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout_at, Instant};

use super::PortSettings;
use crate::error::Result;

/// Trait for reading fixed-size frames from a port
#[async_trait]
pub trait FramePort: Send {
    /// Read up to `buf.len()` bytes, waiting at most the port's timeout
    ///
    /// Returns the number of bytes read. `Ok(0)` means nothing arrived before
    /// the timeout; a count below `buf.len()` is a short read.
    async fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Opens a fresh [`FramePort`] for each reader session
pub trait PortOpener {
    type Port: FramePort;

    /// Open the port described by `settings`
    fn open(&mut self, settings: &PortSettings) -> Result<Self::Port>;
}

/// Wraps any async byte source and gives it pyserial-like timed reads
///
/// The timeout bounds the whole read, not each chunk.
#[derive(Debug)]
pub struct TimedReader<R> {
    inner: R,
    timeout: Duration,
}

impl<R> TimedReader<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl<R> FramePort for TimedReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let deadline = Instant::now() + self.timeout;
        let mut filled = 0;

        while filled < buf.len() {
            match timeout_at(deadline, self.inner.read(&mut buf[filled..])).await {
                Ok(Ok(0)) if filled == 0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "serial port closed",
                    ));
                }
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => filled += n,
                Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => break,
                Ok(Err(e)) => return Err(e),
                Err(_elapsed) => break,
            }
        }

        Ok(filled)
    }
}
