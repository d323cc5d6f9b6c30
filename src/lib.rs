#![cfg_attr(docsrs, feature(doc_cfg))]
//! # bmumon_lib
//!
//! Reads battery management units that speak the `5A A5` framed
//! request/response protocol over a serial line.
//!
//! A [`BatteryMonitor`] sends a fixed catalog of register reads, decodes every
//! response with a resynchronizing [`FrameDecoder`] and assembles the results
//! into a [`BatterySnapshot`].
//!
//! ## Features
//!
//! - `default`: Enables `bin-dependencies`, which is intended for compiling the `bmumon` command-line tool.
//! - `serialport`: Enables [`serialport::SerialTransport`], a [`Transport`] backed by the `serialport` crate.
//!
//! ## Example
//!
//! ```no_run
//! # #[cfg(feature = "serialport")]
//! # fn main() -> Result<(), bmumon_lib::Error> {
//! use bmumon_lib::{serialport::SerialTransport, BatteryMonitor};
//!
//! let transport = SerialTransport::open("/dev/ttyUSB0", 115_200)?;
//! let mut monitor = BatteryMonitor::new(transport);
//! let snapshot = monitor.read_snapshot()?;
//! println!("{:.2} V {:.2} A", snapshot.voltage, snapshot.current);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "serialport"))]
//! # fn main() {}
//! ```

/// Fixed request frames.
pub mod catalog;
/// Byte-at-a-time frame assembly.
pub mod decoder;
mod error;
/// Frame layout and checksum.
pub mod frame;
/// Request sequencing and snapshot assembly.
pub mod monitor;
/// Field extraction from response frames.
pub mod snapshot;
/// Byte channel abstraction.
pub mod transport;

pub use catalog::Metric;
pub use decoder::{FrameDecoder, TrailerRecovery};
pub use error::{Error, FrameError};
pub use frame::Frame;
pub use monitor::{BatteryMonitor, Clock, MonitorOptions, RetryPolicy};
pub use snapshot::{BatterySnapshot, BatteryStatus};
pub use transport::Transport;

/// Synchronous serial port transport.
#[cfg_attr(docsrs, doc(cfg(feature = "serialport")))]
#[cfg(feature = "serialport")]
pub mod serialport;
