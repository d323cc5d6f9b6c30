//! Scripted in-memory transport shared by the integration tests.
#![allow(dead_code)]

pub use bmumon_lib::catalog::{self, Metric};
pub use bmumon_lib::frame::checksum;
pub use bmumon_lib::transport::Transport;

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

/// What the fake BMU does after receiving a request.
#[derive(Debug, Clone)]
pub enum Reply {
    Bytes(Vec<u8>),
    Silence,
}

/// Answers every write with the next scripted reply.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: VecDeque<Reply>,
    inbox: VecDeque<u8>,
    pub written: Vec<Vec<u8>>,
    /// Timeout passed to every `wait_for_data` call.
    pub waits: Vec<Duration>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Bytes already waiting in the receive buffer before the next request.
    pub fn preload(&mut self, bytes: &[u8]) {
        self.inbox.extend(bytes);
    }

    pub fn remaining_replies(&self) -> usize {
        self.replies.len()
    }
}

impl Transport for ScriptedTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.written.push(bytes.to_vec());
        if let Some(Reply::Bytes(reply)) = self.replies.pop_front() {
            self.inbox.extend(reply);
        }
        Ok(())
    }

    fn wait_for_data(&mut self, timeout: Duration) -> io::Result<bool> {
        self.waits.push(timeout);
        Ok(!self.inbox.is_empty())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.inbox.pop_front())
    }
}

/// Response frame for a register read, checksum included.
pub fn response(register: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0x5a, 0xa5, payload.len() as u8, 0x22, 0x20, 0x04, register];
    bytes.extend_from_slice(payload);
    let crc = checksum(&bytes[2..]);
    bytes.extend_from_slice(&crc.to_le_bytes());
    bytes
}

pub fn word(value: u16) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

/// Values of a healthy battery, in snapshot order.
pub struct Battery {
    pub status: u16,
    pub serial: &'static [u8; 14],
    pub remaining_percent: u16,
    pub remaining: u16,
    pub factory: u16,
    pub actual: u16,
    pub current: i16,
    pub voltage: u16,
    pub temperatures: [u8; 2],
    pub cells: [u16; 10],
}

impl Default for Battery {
    fn default() -> Self {
        Self {
            status: 1,
            serial: b"BMU0123456789\0",
            remaining_percent: 87,
            remaining: 5220,
            factory: 6000,
            actual: 5900,
            current: 250,
            voltage: 3900,
            temperatures: [45, 43],
            cells: std::array::from_fn(|i| 3900 + i as u16),
        }
    }
}

impl Battery {
    pub fn reply_for(&self, metric: Metric) -> Vec<u8> {
        let register = metric.descriptor().register;
        let payload = match metric {
            Metric::Status => word(self.status),
            Metric::Serial => self.serial.to_vec(),
            Metric::RemainingCapacityPercent => word(self.remaining_percent),
            Metric::RemainingCapacity => word(self.remaining),
            Metric::FactoryCapacity => word(self.factory),
            Metric::ActualCapacity => word(self.actual),
            Metric::Current => self.current.to_le_bytes().to_vec(),
            Metric::Voltage => word(self.voltage),
            Metric::Temperature => self.temperatures.to_vec(),
            Metric::CellVoltages => self.cells.iter().flat_map(|c| c.to_le_bytes()).collect(),
        };
        response(register, &payload)
    }

    /// One reply per request of a full snapshot, in request order.
    pub fn replies(&self) -> Vec<Reply> {
        catalog::SNAPSHOT_SEQUENCE
            .iter()
            .map(|descriptor| Reply::Bytes(self.reply_for(descriptor.metric)))
            .collect()
    }
}
