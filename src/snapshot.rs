//! Typed fields extracted from validated response frames.
//!
//! Every response carries its data from offset 7 on. Multi-byte values are
//! 16 bits wide with the first byte as the low byte.

use crate::catalog::Metric;
use crate::frame::{Frame, PAYLOAD_OFFSET};
use crate::Error;
use serde::Serialize;

pub const SERIAL_LENGTH: usize = 14;
pub const CELL_COUNT: usize = 10;
pub const TEMPERATURE_ZONES: usize = 2;
/// The BMU reports temperatures shifted up by this many degrees.
const TEMPERATURE_OFFSET: i16 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryStatus {
    Discharging,
    Charging,
    Idle,
    Unknown(u16),
}

impl From<u16> for BatteryStatus {
    fn from(raw: u16) -> Self {
        match raw {
            0 => BatteryStatus::Discharging,
            1 => BatteryStatus::Charging,
            2 => BatteryStatus::Idle,
            other => BatteryStatus::Unknown(other),
        }
    }
}

impl Default for BatteryStatus {
    fn default() -> Self {
        BatteryStatus::Unknown(u16::MAX)
    }
}

/// One complete reading of the battery.
///
/// Numeric fields are only meaningful while `error` is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatterySnapshot {
    pub status: BatteryStatus,
    pub serial: String,
    pub remaining_capacity_percent: u16,
    /// mAh
    pub remaining_capacity: u16,
    /// mAh
    pub factory_capacity: u16,
    /// mAh
    pub actual_capacity: u16,
    /// A, negative while discharging
    pub current: f64,
    /// V
    pub voltage: f64,
    /// W
    pub power: f64,
    /// °C
    pub temperatures: [i16; TEMPERATURE_ZONES],
    /// mV
    pub cell_voltages: [u16; CELL_COUNT],
    /// Seconds since the monitor started.
    pub uptime: u64,
    pub error: String,
}

impl BatterySnapshot {
    /// Snapshot standing in for a failed read.
    pub fn failed(error: &Error) -> Self {
        Self {
            error: error.to_string(),
            ..Default::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_empty()
    }

    /// Actual capacity as a percentage of the factory capacity, `0` if the
    /// factory capacity is unknown.
    pub fn state_of_health(&self) -> u32 {
        match u32::from(self.factory_capacity) {
            0 => 0,
            factory => u32::from(self.actual_capacity) * 100 / factory,
        }
    }

    /// Stores the value carried by `frame` in the field belonging to `metric`.
    pub(crate) fn apply(&mut self, metric: Metric, frame: &Frame) {
        match metric {
            Metric::Status => self.status = decode_status(frame),
            Metric::Serial => self.serial = decode_serial(frame),
            Metric::RemainingCapacityPercent => self.remaining_capacity_percent = decode_word(frame),
            Metric::RemainingCapacity => self.remaining_capacity = decode_word(frame),
            Metric::FactoryCapacity => self.factory_capacity = decode_word(frame),
            Metric::ActualCapacity => self.actual_capacity = decode_word(frame),
            Metric::Current => self.current = decode_current(frame),
            Metric::Voltage => self.voltage = decode_voltage(frame),
            Metric::Temperature => self.temperatures = decode_temperatures(frame),
            Metric::CellVoltages => self.cell_voltages = decode_cell_voltages(frame),
        }
    }
}

pub fn decode_word(frame: &Frame) -> u16 {
    frame.word(PAYLOAD_OFFSET)
}

pub fn decode_status(frame: &Frame) -> BatteryStatus {
    BatteryStatus::from(decode_word(frame))
}

/// NUL-terminated ASCII serial number.
pub fn decode_serial(frame: &Frame) -> String {
    let raw: Vec<u8> = (0..SERIAL_LENGTH)
        .map(|i| frame.byte(PAYLOAD_OFFSET + i))
        .take_while(|&b| b != 0)
        .collect();
    String::from_utf8_lossy(&raw).into_owned()
}

/// Current in A; the BMU reports units of 10 mA.
pub fn decode_current(frame: &Frame) -> f64 {
    decode_word(frame) as i16 as f64 * 10.0 / 1000.0
}

/// Pack voltage in V; the BMU reports units of 10 mV.
pub fn decode_voltage(frame: &Frame) -> f64 {
    decode_word(frame) as f64 * 10.0 / 1000.0
}

pub fn decode_temperatures(frame: &Frame) -> [i16; TEMPERATURE_ZONES] {
    std::array::from_fn(|zone| frame.byte(PAYLOAD_OFFSET + zone) as i16 - TEMPERATURE_OFFSET)
}

pub fn decode_cell_voltages(frame: &Frame) -> [u16; CELL_COUNT] {
    let cells: [u16; CELL_COUNT] =
        std::array::from_fn(|cell| frame.word(PAYLOAD_OFFSET + 2 * cell));
    log::trace!("cell voltages: {cells:?}");
    cells
}
