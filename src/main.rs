use anyhow::{Context, Result};
use bmumon_lib::catalog::SNAPSHOT_SEQUENCE;
use bmumon_lib::serialport::SerialTransport;
use bmumon_lib::BatteryMonitor;
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use std::{ops::Deref, panic};

mod commandline;
mod config;
mod daemon;

use commandline::{CliArgs, CliCommands};

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown>", 0, 0));
        let cause = panic_info
            .payload()
            .downcast_ref::<String>()
            .map(String::deref);
        let cause = cause.unwrap_or_else(|| {
            panic_info
                .payload()
                .downcast_ref::<&str>()
                .copied()
                .unwrap_or("<cause unknown>")
        });

        error!(
            "Thread '{}' panicked at {}:{}:{}: {}",
            std::thread::current().name().unwrap_or("<unknown>"),
            filename,
            line,
            column,
            cause
        );
    }));
    log_handle
}

fn open_monitor(config: &config::Config) -> Result<BatteryMonitor<SerialTransport>> {
    let mut transport = SerialTransport::open(&config.device, config.baud_rate)
        .with_context(|| format!("Cannot open serial port '{}'", config.device))?;
    transport.set_idle_gap(config.idle_gap);
    let mut monitor = BatteryMonitor::new(transport);
    monitor.set_options(config.monitor_options());
    Ok(monitor)
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter());

    let config = config::Config::from_args(&args)?;

    match args.command {
        CliCommands::Catalog => {
            for descriptor in SNAPSHOT_SEQUENCE {
                println!(
                    "{:<28} register={:#04X} read_len={:>2} request={:02X?}",
                    descriptor.metric.name(),
                    descriptor.register,
                    descriptor.read_len,
                    descriptor.request
                );
            }
        }
        CliCommands::Snapshot { json } => {
            let mut monitor = open_monitor(&config)?;
            let snapshot = monitor
                .read_snapshot()
                .with_context(|| "Cannot read battery snapshot")?;
            if json {
                println!("{}", daemon::render_json(&snapshot)?);
            } else {
                println!("{}", daemon::render_text(&snapshot));
            }
        }
        CliCommands::Query { metric } => {
            let mut monitor = open_monitor(&config)?;
            let frame = monitor
                .query(metric)
                .with_context(|| format!("Cannot read {metric}"))?;
            println!("{metric}: {frame:?}");
            println!("payload: {:02X?}", frame.payload());
        }
        CliCommands::Daemon { interval, json } => {
            let monitor = open_monitor(&config)?;
            daemon::run(monitor, interval, json)?;
        }
    }

    Ok(())
}
