use bmumon_lib::Metric;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Read every metric once and print the battery snapshot
    Snapshot {
        /// Print the snapshot as JSON
        #[clap(long, short, action)]
        json: bool,
    },
    /// Send a single request and print the validated response frame
    Query {
        /// One of: status, serial, remaining-capacity-percent, remaining-capacity,
        /// factory-capacity, actual-capacity, current, voltage, temperature, cell-voltages
        metric: Metric,
    },
    /// Run in daemon mode, periodically reading snapshots and printing them to the console
    Daemon {
        /// Interval between readings (e.g., "10s", "1m")
        #[clap(long, short, value_parser = humantime::parse_duration, default_value = "10s")]
        interval: Duration,
        /// Print every snapshot as one JSON line
        #[clap(long, short, action)]
        json: bool,
    },
    /// Print the request frames sent to the BMU
    Catalog,
}

const fn about_text() -> &'static str {
    "battery management unit serial monitor"
}

#[derive(Parser, Debug)]
#[command(version, about=about_text(), long_about = None)]
pub struct CliArgs {
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// YAML configuration file; command line options take precedence over it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Serial port device path (e.g., /dev/ttyUSB0 on Linux, COM1 on Windows)
    #[arg(short, long)]
    pub device: Option<String>,

    /// Serial line speed
    #[arg(short, long)]
    pub baud_rate: Option<u32>,

    #[command(subcommand)]
    pub command: CliCommands,

    /// Time to wait for the first byte of a response (e.g., "500ms", "1s")
    #[arg(value_parser = humantime::parse_duration, long)]
    pub timeout: Option<Duration>,

    /// Number of attempts per request before a reading is given up
    #[arg(long)]
    pub retries: Option<u8>,

    /// Pause between two attempts of the same request (e.g., "500ms")
    #[arg(value_parser = humantime::parse_duration, long)]
    pub retry_delay: Option<Duration>,
}
