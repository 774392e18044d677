//! # rfrx
//!
//! Read SBUS frames from an RC receiver on a serial port and print them.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load the TOML configuration (optional) and apply CLI/environment overrides
//!    - Set up logging with tracing subscriber
//!    - Build the frame decoder for the configured channel count
//!
//! 2. **Main Loop**
//!    - Open the serial port, read and decode 25-byte frames
//!    - Print each frame as text, JSON Lines, or calibrated Pro-Tronik sticks
//!    - Reopen the port after errors
//!
//! 3. **Graceful Shutdown**
//!    - Ctrl+C stops the loop after the current read completes
//!
//! # Examples
//!
//! ```bash
//! RFRX_PORT=/dev/ttyAMA0 rfrx --output json
//! rfrx --config rfrx.toml --parity none --output protronik
//! ```

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use rfrx::calibration::protronik::{ProTronikCalibration, ProTronikSink, PROTRONIK_CHANNELS};
use rfrx::config::{Config, LoggingConfig};
use rfrx::reader::{FrameReader, RunFlag};
use rfrx::sbus::decoder::FrameDecoder;
use rfrx::serial::{ParitySetting, SerialOpener};
use rfrx::sink::{FrameSink, JsonLinesSink, TextSink};

/// Strings that turn a boolean switch off
const FALSY: &[&str] = &["0", "no", "off", "false"];

/// Output format for decoded frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Raw channels and flags, one frame per line
    Text,
    /// JSON Lines with a timestamp per frame
    Json,
    /// Calibrated Pro-Tronik PTR-6A v2 sticks and switches
    Protronik,
}

/// Read SBUS frames from a serial port
#[derive(Debug, Parser)]
#[command(name = "rfrx", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "RFRX_CONFIG")]
    config: Option<PathBuf>,

    /// Serial device path
    #[arg(short, long, env = "RFRX_PORT")]
    port: Option<String>,

    /// Number of channels to decode (0-16)
    #[arg(long, env = "RFRX_N_CHANS", allow_negative_numbers = true)]
    n_chans: Option<i64>,

    /// Read timeout in seconds
    #[arg(long, env = "RFRX_TIMEOUT")]
    timeout: Option<u64>,

    /// Read timeout in milliseconds; wins over --timeout
    #[arg(long, env = "RFRX_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Start the read loop (off, no, false or 0 to disable)
    #[arg(long, env = "RFRX_RUNNING", value_parser = parse_switch)]
    running: Option<bool>,

    /// Reopen the port after failures (off, no, false or 0 to disable)
    #[arg(long, env = "RFRX_RETRY", value_parser = parse_switch)]
    retry: Option<bool>,

    /// Serial parity
    #[arg(long, env = "RFRX_PARITY", value_enum)]
    parity: Option<ParitySetting>,

    /// Log level (trace, debug, info, warn or warning, error or critical)
    #[arg(long, env = "RFRX_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[command(flatten)]
    calibration: CalibrationArgs,
}

/// Stick calibration overrides for the Pro-Tronik output
#[derive(Debug, clap::Args)]
#[command(next_help_heading = "Calibration")]
struct CalibrationArgs {
    #[arg(long, env = "RH_MIN")]
    rh_min: Option<u16>,
    #[arg(long, env = "RH_MID")]
    rh_mid: Option<u16>,
    #[arg(long, env = "RH_MAX")]
    rh_max: Option<u16>,
    #[arg(long, env = "RV_MIN")]
    rv_min: Option<u16>,
    #[arg(long, env = "RV_MID")]
    rv_mid: Option<u16>,
    #[arg(long, env = "RV_MAX")]
    rv_max: Option<u16>,
    #[arg(long, env = "LV_MIN")]
    lv_min: Option<u16>,
    #[arg(long, env = "LV_MID")]
    lv_mid: Option<u16>,
    #[arg(long, env = "LV_MAX")]
    lv_max: Option<u16>,
    #[arg(long, env = "LH_MIN")]
    lh_min: Option<u16>,
    #[arg(long, env = "LH_MID")]
    lh_mid: Option<u16>,
    #[arg(long, env = "LH_MAX")]
    lh_max: Option<u16>,
}

impl CalibrationArgs {
    fn apply(&self, calibration: &mut ProTronikCalibration) {
        let axes = [
            (&mut calibration.rh, [self.rh_min, self.rh_mid, self.rh_max]),
            (&mut calibration.rv, [self.rv_min, self.rv_mid, self.rv_max]),
            (&mut calibration.lv, [self.lv_min, self.lv_mid, self.lv_max]),
            (&mut calibration.lh, [self.lh_min, self.lh_mid, self.lh_max]),
        ];
        for (axis, [min, mid, max]) in axes {
            axis.min = min.unwrap_or(axis.min);
            axis.mid = mid.unwrap_or(axis.mid);
            axis.max = max.unwrap_or(axis.max);
        }
    }
}

/// Anything but a falsy string enables the switch
fn parse_switch(value: &str) -> std::result::Result<bool, String> {
    let value = value.trim().to_lowercase();
    Ok(!FALSY.contains(&value.as_str()))
}

impl Cli {
    /// Load the configuration file (if any) and apply overrides
    fn into_config(self) -> Result<(Config, OutputFormat)> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(port) = self.port {
            config.serial.port = port;
        }
        if let Some(n_chans) = self.n_chans {
            config.reader.n_chans = n_chans;
        }
        if let Some(secs) = self.timeout {
            config.serial.timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.serial.timeout_ms = timeout_ms;
        }
        if let Some(running) = self.running {
            config.reader.running = running;
        }
        if let Some(retry) = self.retry {
            config.reader.retry = retry;
        }
        if let Some(parity) = self.parity {
            config.serial.parity = parity;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        self.calibration.apply(&mut config.calibration);

        config.validate().context("invalid configuration")?;
        Ok((config, self.output))
    }
}

/// Install the tracing subscriber
///
/// Logs go to stderr so frames on stdout stay machine-readable. `RUST_LOG`
/// takes precedence over the configured level. The returned guard flushes the
/// file writer and must live until exit.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.filter_level().unwrap_or("warn")));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    match &logging.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "rfrx.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

/// Run the reader until stopped, then log its counters
async fn run_reader<S: FrameSink>(
    config: &Config,
    decoder: FrameDecoder,
    sink: S,
    running: RunFlag,
) -> Result<()> {
    let mut reader =
        FrameReader::new(SerialOpener, decoder, sink, config.reader_config(), running);
    let stats = reader.run().await?;
    info!(
        "Sessions: {}, frames: {}, empty reads: {}, decode errors: {}, transport errors: {}",
        stats.sessions,
        stats.frames,
        stats.empty_reads,
        stats.decode_errors,
        stats.transport_errors
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let (config, output) = Cli::parse().into_config()?;
    let _log_guard = init_logging(&config.logging);

    info!("rfrx v{} starting...", env!("CARGO_PKG_VERSION"));

    let decoder = config.decoder()?;
    if output == OutputFormat::Protronik && decoder.n_chans() < PROTRONIK_CHANNELS {
        bail!(
            "protronik output needs at least {} channels, n_chans is {}",
            PROTRONIK_CHANNELS,
            decoder.n_chans()
        );
    }

    let running = RunFlag::new(config.reader.running);
    let stopper = running.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping after the current read...");
            stopper.stop();
        }
    });

    info!("Reading SBUS frames from {}", config.serial.port);

    match output {
        OutputFormat::Text => {
            run_reader(&config, decoder, TextSink::new(io::stdout()), running).await
        }
        OutputFormat::Json => {
            run_reader(&config, decoder, JsonLinesSink::new(io::stdout()), running).await
        }
        OutputFormat::Protronik => {
            let sink = ProTronikSink::new(config.calibration, io::stdout());
            run_reader(&config, decoder, sink, running).await
        }
    }
}
