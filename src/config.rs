use crate::commandline::CliArgs;
use anyhow::{Context, Result};
use bmumon_lib::serialport::{DEFAULT_BAUD_RATE, DEFAULT_IDLE_GAP};
use bmumon_lib::{monitor, MonitorOptions, RetryPolicy, TrailerRecovery};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

fn default_device_name() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1")
    } else {
        String::from("/dev/ttyUSB0")
    }
}

/// Connection and protocol settings.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_device_name")]
    pub device: String,
    #[serde(default = "Config::default_baud_rate")]
    pub baud_rate: u32,
    #[serde(
        default = "Config::default_response_timeout",
        with = "humantime_serde"
    )]
    pub response_timeout: Duration,
    /// Silence after which a response counts as complete.
    #[serde(default = "Config::default_idle_gap", with = "humantime_serde")]
    pub idle_gap: Duration,
    #[serde(default = "Config::default_max_attempts")]
    pub max_attempts: u8,
    #[serde(default = "Config::default_retry_delay", with = "humantime_serde")]
    pub retry_delay: Duration,
    /// Byte that completes a response missing its last trailer byte, `~` to reject such responses.
    #[serde(default = "Config::default_trailer_fill")]
    pub trailer_fill: Option<u8>,
    #[serde(default)]
    pub verify_echo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: default_device_name(),
            baud_rate: Self::default_baud_rate(),
            response_timeout: Self::default_response_timeout(),
            idle_gap: Self::default_idle_gap(),
            max_attempts: Self::default_max_attempts(),
            retry_delay: Self::default_retry_delay(),
            trailer_fill: Self::default_trailer_fill(),
            verify_echo: false,
        }
    }
}

impl Config {
    fn default_baud_rate() -> u32 {
        DEFAULT_BAUD_RATE
    }

    fn default_response_timeout() -> Duration {
        monitor::RESPONSE_TIMEOUT
    }

    fn default_idle_gap() -> Duration {
        DEFAULT_IDLE_GAP
    }

    fn default_max_attempts() -> u8 {
        1
    }

    fn default_retry_delay() -> Duration {
        monitor::RETRY_DELAY
    }

    fn default_trailer_fill() -> Option<u8> {
        Some(0xff)
    }

    pub fn load(config_file_path: &Path) -> Result<Self> {
        log::debug!("Loading config file from {config_file_path:?}");
        let config_file = std::fs::File::open(config_file_path)
            .with_context(|| format!("Cannot open config file {config_file_path:?}"))?;
        let config: Self = serde_yaml::from_reader(&config_file)
            .with_context(|| format!("Cannot read config from file: {config_file_path:?}"))?;
        Ok(config)
    }

    /// Loads the file named on the command line, if any, and applies the command line overrides.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(device) = &args.device {
            config.device.clone_from(device);
        }
        if let Some(baud_rate) = args.baud_rate {
            config.baud_rate = baud_rate;
        }
        if let Some(timeout) = args.timeout {
            config.response_timeout = timeout;
        }
        if let Some(retries) = args.retries {
            config.max_attempts = retries;
        }
        if let Some(retry_delay) = args.retry_delay {
            config.retry_delay = retry_delay;
        }
        log::debug!("Effective config: {config:?}");
        Ok(config)
    }

    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            response_timeout: self.response_timeout,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                delay: self.retry_delay,
            },
            trailer_recovery: match self.trailer_fill {
                Some(fill) => TrailerRecovery::Fill(fill),
                None => TrailerRecovery::Reject,
            },
            verify_echo: self.verify_echo,
        }
    }
}
