//! Fixed request frames understood by the BMU.
//!
//! Every request reads `read_len` bytes from a register: the frame is
//! `5A A5 01 20 22 01 <register> <read_len> <crc_lo> <crc_hi>`. The frames are
//! assembled at compile time, checksum included.

use crate::frame::{self, Frame};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const REQUEST_LENGTH: usize = 10;

const HOST_ADDRESS: u8 = 0x20;
const BMU_ADDRESS: u8 = 0x22;
const READ_COMMAND: u8 = 0x01;

/// Builds a register read request.
pub const fn read_request(register: u8, read_len: u8) -> [u8; REQUEST_LENGTH] {
    let covered = [0x01, HOST_ADDRESS, BMU_ADDRESS, READ_COMMAND, register, read_len];
    let crc = frame::checksum(&covered).to_le_bytes();
    [
        frame::HEADER[0],
        frame::HEADER[1],
        covered[0],
        covered[1],
        covered[2],
        covered[3],
        covered[4],
        covered[5],
        crc[0],
        crc[1],
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    Status,
    Serial,
    RemainingCapacityPercent,
    RemainingCapacity,
    FactoryCapacity,
    ActualCapacity,
    Current,
    Voltage,
    Temperature,
    CellVoltages,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::Status,
        Metric::Serial,
        Metric::RemainingCapacityPercent,
        Metric::RemainingCapacity,
        Metric::FactoryCapacity,
        Metric::ActualCapacity,
        Metric::Current,
        Metric::Voltage,
        Metric::Temperature,
        Metric::CellVoltages,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Status => "status",
            Metric::Serial => "serial",
            Metric::RemainingCapacityPercent => "remaining-capacity-percent",
            Metric::RemainingCapacity => "remaining-capacity",
            Metric::FactoryCapacity => "factory-capacity",
            Metric::ActualCapacity => "actual-capacity",
            Metric::Current => "current",
            Metric::Voltage => "voltage",
            Metric::Temperature => "temperature",
            Metric::CellVoltages => "cell-voltages",
        }
    }

    pub fn descriptor(self) -> &'static CommandDescriptor {
        match self {
            Metric::Status => &STATUS,
            Metric::Serial => &SERIAL,
            Metric::RemainingCapacityPercent => &REMAINING_CAPACITY_PERCENT,
            Metric::RemainingCapacity => &REMAINING_CAPACITY,
            Metric::FactoryCapacity => &FACTORY_CAPACITY,
            Metric::ActualCapacity => &ACTUAL_CAPACITY,
            Metric::Current => &CURRENT,
            Metric::Voltage => &VOLTAGE,
            Metric::Temperature => &TEMPERATURE,
            Metric::CellVoltages => &CELL_VOLTAGES,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric '{0}'")]
pub struct UnknownMetric(String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|metric| metric.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

/// One immutable entry of the catalog.
#[derive(Debug, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub metric: Metric,
    pub register: u8,
    /// Payload bytes the BMU is asked to return.
    pub read_len: u8,
    pub request: [u8; REQUEST_LENGTH],
}

impl CommandDescriptor {
    const fn read(metric: Metric, register: u8, read_len: u8) -> Self {
        Self {
            metric,
            register,
            read_len,
            request: read_request(register, read_len),
        }
    }

    /// Precomputed checksum carried in the request trailer.
    pub fn checksum(&self) -> u16 {
        u16::from_le_bytes([self.request[8], self.request[9]])
    }

    /// Whether `frame` answers this request (its `arg` echoes the register).
    pub fn is_answered_by(&self, frame: &Frame) -> bool {
        frame.arg() == self.register
    }
}

pub static STATUS: CommandDescriptor = CommandDescriptor::read(Metric::Status, 0x30, 0x02);
pub static SERIAL: CommandDescriptor = CommandDescriptor::read(Metric::Serial, 0x10, 0x0e);
pub static REMAINING_CAPACITY_PERCENT: CommandDescriptor =
    CommandDescriptor::read(Metric::RemainingCapacityPercent, 0x32, 0x02);
pub static REMAINING_CAPACITY: CommandDescriptor =
    CommandDescriptor::read(Metric::RemainingCapacity, 0x31, 0x02);
pub static ACTUAL_CAPACITY: CommandDescriptor =
    CommandDescriptor::read(Metric::ActualCapacity, 0x19, 0x02);
pub static FACTORY_CAPACITY: CommandDescriptor =
    CommandDescriptor::read(Metric::FactoryCapacity, 0x18, 0x02);
pub static CURRENT: CommandDescriptor = CommandDescriptor::read(Metric::Current, 0x33, 0x02);
pub static VOLTAGE: CommandDescriptor = CommandDescriptor::read(Metric::Voltage, 0x34, 0x02);
pub static CELL_VOLTAGES: CommandDescriptor =
    CommandDescriptor::read(Metric::CellVoltages, 0x40, 0x14);
pub static TEMPERATURE: CommandDescriptor =
    CommandDescriptor::read(Metric::Temperature, 0x35, 0x02);

/// The order in which a snapshot is read.
pub static SNAPSHOT_SEQUENCE: [&CommandDescriptor; 10] = [
    &STATUS,
    &SERIAL,
    &REMAINING_CAPACITY_PERCENT,
    &REMAINING_CAPACITY,
    &FACTORY_CAPACITY,
    &ACTUAL_CAPACITY,
    &CURRENT,
    &VOLTAGE,
    &TEMPERATURE,
    &CELL_VOLTAGES,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_match_known_firmware_frames() {
        let known: [(&CommandDescriptor, [u8; REQUEST_LENGTH]); 10] = [
            (&STATUS, [0x5a, 0xa5, 0x01, 0x20, 0x22, 0x01, 0x30, 0x02, 0x89, 0xff]),
            (&SERIAL, [0x5a, 0xa5, 0x01, 0x20, 0x22, 0x01, 0x10, 0x0e, 0x9d, 0xff]),
            (
                &REMAINING_CAPACITY_PERCENT,
                [0x5a, 0xa5, 0x01, 0x20, 0x22, 0x01, 0x32, 0x02, 0x87, 0xff],
            ),
            (
                &REMAINING_CAPACITY,
                [0x5a, 0xa5, 0x01, 0x20, 0x22, 0x01, 0x31, 0x02, 0x88, 0xff],
            ),
            (
                &ACTUAL_CAPACITY,
                [0x5a, 0xa5, 0x01, 0x20, 0x22, 0x01, 0x19, 0x02, 0xa0, 0xff],
            ),
            (
                &FACTORY_CAPACITY,
                [0x5a, 0xa5, 0x01, 0x20, 0x22, 0x01, 0x18, 0x02, 0xa1, 0xff],
            ),
            (&CURRENT, [0x5a, 0xa5, 0x01, 0x20, 0x22, 0x01, 0x33, 0x02, 0x86, 0xff]),
            (&VOLTAGE, [0x5a, 0xa5, 0x01, 0x20, 0x22, 0x01, 0x34, 0x02, 0x85, 0xff]),
            (
                &CELL_VOLTAGES,
                [0x5a, 0xa5, 0x01, 0x20, 0x22, 0x01, 0x40, 0x14, 0x67, 0xff],
            ),
            (
                &TEMPERATURE,
                [0x5a, 0xa5, 0x01, 0x20, 0x22, 0x01, 0x35, 0x02, 0x84, 0xff],
            ),
        ];
        for (descriptor, bytes) in known {
            assert_eq!(descriptor.request, bytes, "{}", descriptor.metric);
            assert!(frame::verify(&descriptor.request, 1));
        }
    }

    #[test]
    fn sequence_covers_every_metric_once() {
        for metric in Metric::ALL {
            let count = SNAPSHOT_SEQUENCE
                .iter()
                .filter(|d| d.metric == metric)
                .count();
            assert_eq!(count, 1, "{metric}");
            assert_eq!(metric.descriptor().metric, metric);
        }
    }

    #[test]
    fn metric_names_parse_back() {
        for metric in Metric::ALL {
            assert_eq!(metric.name().parse::<Metric>(), Ok(metric));
        }
        assert!("volts".parse::<Metric>().is_err());
    }
}
