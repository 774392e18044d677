//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; an empty file yields the defaults.
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyS0"
//! timeout_ms = 1000
//! reconnect_interval_ms = 1000
//! parity = "even"
//!
//! [reader]
//! running = true
//! retry = true
//! n_chans = 16
//!
//! [logging]
//! level = "warn"
//! log_dir = "./logs"
//!
//! [calibration]
//! rh = { min = 192, mid = 992, max = 1796 }
//! ```

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::calibration::protronik::ProTronikCalibration;
use crate::error::{RfrxError, Result};
use crate::reader::ReaderConfig;
use crate::sbus::decoder::FrameDecoder;
use crate::serial::{ParitySetting, PortSettings, DEFAULT_DEVICE_PATH};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub reader: ReaderSection,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub calibration: ProTronikCalibration,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    #[serde(default)]
    pub parity: ParitySetting,
}

/// Read loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ReaderSection {
    #[serde(default = "default_running")]
    pub running: bool,

    #[serde(default = "default_retry")]
    pub retry: bool,

    #[serde(default = "default_n_chans")]
    pub n_chans: i64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub log_dir: Option<String>,
}

// Default value functions
fn default_serial_port() -> String { DEFAULT_DEVICE_PATH.to_string() }
fn default_timeout_ms() -> u64 { 1000 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_running() -> bool { true }
fn default_retry() -> bool { true }
fn default_n_chans() -> i64 { 16 }

fn default_log_level() -> String { "warn".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            timeout_ms: default_timeout_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            parity: ParitySetting::default(),
        }
    }
}

impl Default for ReaderSection {
    fn default() -> Self {
        Self {
            running: default_running(),
            retry: default_retry(),
            n_chans: default_n_chans(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

/// Accepted log levels
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Alternate spellings mapped onto [`LOG_LEVELS`]
const LOG_LEVEL_ALIASES: &[(&str, &str)] = &[("warning", "warn"), ("critical", "error")];

impl LoggingConfig {
    /// Level as a tracing filter directive, with aliases resolved
    ///
    /// Returns `None` for unknown levels.
    pub fn filter_level(&self) -> Option<&'static str> {
        let level = self.level.trim().to_lowercase();
        LOG_LEVEL_ALIASES
            .iter()
            .find(|(alias, _)| *alias == level)
            .map(|(_, canonical)| *canonical)
            .or_else(|| LOG_LEVELS.iter().copied().find(|known| *known == level))
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rfrx::config::Config;
    ///
    /// let config = Config::load("config/rfrx.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.serial.reconnect_interval_ms == 0 || self.serial.reconnect_interval_ms > 60000 {
            return Err(invalid("reconnect_interval_ms must be between 1 and 60000"));
        }

        // Same range check the decoder applies, reported as a config error
        if !(0..=16).contains(&self.reader.n_chans) {
            return Err(invalid(&format!(
                "n_chans must be between 0 and 16, got {}",
                self.reader.n_chans
            )));
        }

        if self.logging.filter_level().is_none() {
            return Err(invalid(&format!(
                "log level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }

        if matches!(&self.logging.log_dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("log_dir cannot be empty when set"));
        }

        self.calibration.validate().map_err(|e| invalid(&e))?;

        Ok(())
    }

    /// Port settings for the reader
    pub fn port_settings(&self) -> PortSettings {
        PortSettings {
            path: self.serial.port.clone(),
            parity: self.serial.parity,
            timeout: Duration::from_millis(self.serial.timeout_ms),
        }
    }

    /// Reader loop settings
    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            port: self.port_settings(),
            retry: self.reader.retry,
            backoff: Duration::from_millis(self.serial.reconnect_interval_ms),
        }
    }

    /// Build the frame decoder for the configured channel count
    ///
    /// # Errors
    ///
    /// Returns `RfrxError::ChannelCount` if `n_chans` is outside 0..=16
    pub fn decoder(&self) -> Result<FrameDecoder> {
        FrameDecoder::try_from(self.reader.n_chans)
    }
}

fn invalid(msg: &str) -> RfrxError {
    RfrxError::Config(toml::de::Error::custom(msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::AxisRange;

    fn create_valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config() {
        let config = create_valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.serial.port, "/dev/ttyS0");
        assert_eq!(config.reader.n_chans, 16);
        assert!(config.reader.running);
        assert!(config.reader.retry);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.serial.port, default_serial_port());
        assert_eq!(config.serial.timeout_ms, 1000);
        assert_eq!(config.serial.parity, ParitySetting::Even);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.calibration, ProTronikCalibration::default());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyAMA0"
timeout_ms = 500
parity = "none"

[reader]
retry = false
n_chans = 6

[logging]
level = "debug"
log_dir = "/tmp/rfrx"

[calibration]
rh = { min = 200, mid = 1000, max = 1800 }
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyAMA0");
        assert_eq!(config.serial.parity, ParitySetting::None);
        assert!(!config.reader.retry);
        assert_eq!(config.reader.n_chans, 6);
        assert_eq!(config.logging.log_dir.as_deref(), Some("/tmp/rfrx"));
        assert_eq!(config.calibration.rh, AxisRange::new(200, 1000, 1800));
        assert_eq!(config.calibration.lh, ProTronikCalibration::default().lh);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/rfrx.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.serial.port, default_serial_port());
        assert_eq!(config.serial.parity, ParitySetting::Even);
        assert_eq!(config.reader.n_chans, default_n_chans());
        assert_eq!(config.calibration, ProTronikCalibration::default());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/rfrx.toml");
        assert!(matches!(result, Err(RfrxError::Io(_))));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(Config::parse("[serial"), Err(RfrxError::Config(_))));
    }

    #[test]
    fn test_unknown_parity() {
        assert!(Config::parse("[serial]\nparity = \"mark\"").is_err());
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = create_valid_config();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_zero() {
        let mut config = create_valid_config();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_too_high() {
        let mut config = create_valid_config();
        config.serial.timeout_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reconnect_interval_zero() {
        let mut config = create_valid_config();
        config.serial.reconnect_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reconnect_interval_too_high() {
        let mut config = create_valid_config();
        config.serial.reconnect_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_n_chans_out_of_range() {
        for n in [-1, 17] {
            let mut config = create_valid_config();
            config.reader.n_chans = n;
            assert!(config.validate().is_err(), "n_chans {} should be invalid", n);
            assert!(matches!(config.decoder(), Err(RfrxError::ChannelCount(_))));
        }
    }

    #[test]
    fn test_n_chans_bounds_valid() {
        for n in [0, 16] {
            let mut config = create_valid_config();
            config.reader.n_chans = n;
            assert!(config.validate().is_ok());
            assert_eq!(config.decoder().unwrap().n_chans() as i64, n);
        }
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_case_insensitive() {
        let mut config = create_valid_config();
        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_level_aliases() {
        let mut config = create_valid_config();
        for (level, expected) in [("WARNING", "warn"), ("warning", "warn"), ("CRITICAL", "error")] {
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "{} should be accepted", level);
            assert_eq!(config.logging.filter_level(), Some(expected));
        }
        config.logging.level = "Info".to_string();
        assert_eq!(config.logging.filter_level(), Some("info"));
    }

    #[test]
    fn test_empty_log_dir() {
        let mut config = create_valid_config();
        config.logging.log_dir = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_calibration() {
        let mut config = create_valid_config();
        config.calibration.rv = AxisRange::new(1100, 1100, 1900);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("calibration.rv"));
    }

    #[test]
    fn test_reader_config_conversion() {
        let mut config = create_valid_config();
        config.serial.timeout_ms = 250;
        config.serial.reconnect_interval_ms = 2000;
        config.reader.retry = false;

        let reader = config.reader_config();
        assert_eq!(reader.port.path, "/dev/ttyS0");
        assert_eq!(reader.port.timeout, Duration::from_millis(250));
        assert_eq!(reader.backoff, Duration::from_secs(2));
        assert!(!reader.retry);
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyS0");
        assert_eq!(default_timeout_ms(), 1000);
        assert_eq!(default_reconnect_interval_ms(), 1000);
        assert!(default_running());
        assert!(default_retry());
        assert_eq!(default_n_chans(), 16);
        assert_eq!(default_log_level(), "warn");
    }
}
