//! End-to-end read loop tests over timed mock streams

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use tokio_test::io::{Builder, Mock};

use rfrx::error::{RfrxError, Result};
use rfrx::reader::{FrameReader, ReaderConfig, RunFlag};
use rfrx::sbus::decoder::FrameDecoder;
use rfrx::sbus::protocol::DecodedFrame;
use rfrx::serial::port_trait::{PortOpener, TimedReader};
use rfrx::serial::PortSettings;

const FRAME_CENTERED: [u8; 25] = [
    0x0F, 0xE0, 0x63, 0x22, 0xF1, 0xC0, 0x07, 0x3E, 0x7F, 0x83, 0x0F, 0x7C, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

const FRAME_RIGHT_STICK_LEFT: [u8; 25] = [
    0x0F, 0x43, 0x62, 0xE2, 0xF0, 0xC0, 0x07, 0x0C, 0x80, 0x83, 0x0F, 0x7C, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Hands out one prepared stream per session
struct StreamOpener {
    streams: VecDeque<Mock>,
    running: RunFlag,
}

impl StreamOpener {
    fn new(streams: Vec<Mock>, running: RunFlag) -> Self {
        Self {
            streams: streams.into(),
            running,
        }
    }
}

impl PortOpener for StreamOpener {
    type Port = TimedReader<Mock>;

    fn open(&mut self, settings: &PortSettings) -> Result<Self::Port> {
        match self.streams.pop_front() {
            Some(stream) => Ok(TimedReader::new(stream, settings.timeout)),
            None => {
                self.running.stop();
                Err(RfrxError::Serial("no more streams".to_string()))
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn empty_reads_then_frame_in_one_session() {
    let running = RunFlag::default();
    // Three full timeouts pass before the frame arrives
    let stream = Builder::new()
        .wait(Duration::from_millis(3500))
        .read(&FRAME_CENTERED)
        .build();
    let opener = StreamOpener::new(vec![stream], running.clone());

    let mut frames: Vec<DecodedFrame> = Vec::new();
    let stats = {
        let stopper = running.clone();
        let sink = |frame: &DecodedFrame| -> anyhow::Result<()> {
            frames.push(frame.clone());
            stopper.stop();
            Ok(())
        };
        let mut reader = FrameReader::new(
            opener,
            FrameDecoder::new(6).unwrap(),
            sink,
            ReaderConfig::default(),
            running,
        );
        let stats = reader.run().await.unwrap();
        stats
    };

    assert_eq!(stats.sessions, 1);
    assert_eq!(stats.empty_reads, 3);
    assert_eq!(stats.frames, 1);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].channels[0], 992);
    assert!(!frames[0].failsafe);
    assert!(!frames[0].frame_lost);
    assert!(!frames[0].ch17);
    assert!(!frames[0].ch18);
}

#[tokio::test(start_paused = true)]
async fn malformed_frame_reopens_session() {
    let running = RunFlag::default();
    let mut bad = FRAME_CENTERED;
    bad[0] = 0x0E;

    let first = Builder::new().read(&bad).build();
    let second = Builder::new().read(&FRAME_RIGHT_STICK_LEFT).build();
    let opener = StreamOpener::new(vec![first, second], running.clone());

    let mut frames: Vec<DecodedFrame> = Vec::new();
    let start = Instant::now();
    let stats = {
        let stopper = running.clone();
        let sink = |frame: &DecodedFrame| -> anyhow::Result<()> {
            frames.push(frame.clone());
            stopper.stop();
            Ok(())
        };
        let mut reader = FrameReader::new(
            opener,
            FrameDecoder::default(),
            sink,
            ReaderConfig::default(),
            running,
        );
        let stats = reader.run().await.unwrap();
        stats
    };

    assert!(start.elapsed() >= Duration::from_secs(1));
    assert_eq!(stats.sessions, 2);
    assert_eq!(stats.decode_errors, 1);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].channels[0], 579);
}

#[tokio::test(start_paused = true)]
async fn frame_split_across_reads_is_reassembled() {
    let running = RunFlag::default();
    let stream = Builder::new()
        .read(&FRAME_CENTERED[..7])
        .wait(Duration::from_millis(200))
        .read(&FRAME_CENTERED[7..])
        .build();
    let opener = StreamOpener::new(vec![stream], running.clone());

    let mut count = 0;
    let stats = {
        let stopper = running.clone();
        let sink = |frame: &DecodedFrame| -> anyhow::Result<()> {
            assert_eq!(frame.channels.len(), 16);
            count += 1;
            stopper.stop();
            Ok(())
        };
        let mut reader = FrameReader::new(
            opener,
            FrameDecoder::default(),
            sink,
            ReaderConfig::default(),
            running,
        );
        let stats = reader.run().await.unwrap();
        stats
    };

    assert_eq!(count, 1);
    assert_eq!(stats.decode_errors, 0);
    assert_eq!(stats.empty_reads, 0);
}

#[tokio::test(start_paused = true)]
async fn closed_stream_is_a_transport_error() {
    let running = RunFlag::default();
    // Empty stream reports EOF immediately
    let dead = Builder::new().build();
    let live = Builder::new().read(&FRAME_CENTERED).build();
    let opener = StreamOpener::new(vec![dead, live], running.clone());

    let stopper = running.clone();
    let sink = move |_frame: &DecodedFrame| -> anyhow::Result<()> {
        stopper.stop();
        Ok(())
    };
    let mut reader = FrameReader::new(
        opener,
        FrameDecoder::default(),
        sink,
        ReaderConfig::default(),
        running,
    );

    let stats = reader.run().await.unwrap();
    assert_eq!(stats.transport_errors, 1);
    assert_eq!(stats.sessions, 2);
    assert_eq!(stats.frames, 1);
}
