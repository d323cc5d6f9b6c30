use crate::transport::Transport;
use crate::Error;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// How long a read may wait for the next byte before the line counts as quiet.
// At 115200 baud a byte takes ~87us, so this leaves room for a slow UART bridge.
pub const DEFAULT_IDLE_GAP: Duration = Duration::from_millis(2);

const POLL_INTERVAL: Duration = Duration::from_micros(500);

/// [`Transport`] over a local serial port.
#[derive(Debug)]
pub struct SerialTransport {
    serial: Box<dyn serialport::SerialPort>,
    idle_gap: Duration,
}

impl SerialTransport {
    pub fn open(port: &str, baud_rate: u32) -> Result<Self, Error> {
        log::debug!("Opening serial port '{port}' at {baud_rate} baud");
        let serial = serialport::new(port, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()?;
        Ok(Self {
            serial,
            idle_gap: DEFAULT_IDLE_GAP,
        })
    }

    pub fn set_idle_gap(&mut self, idle_gap: Duration) {
        log::trace!("set idle gap to {idle_gap:?}");
        self.idle_gap = idle_gap;
    }

    fn pending(&self) -> io::Result<u32> {
        self.serial.bytes_to_read().map_err(io::Error::from)
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        log::trace!("write bytes: {bytes:02X?}");
        self.serial.write_all(bytes)
    }

    fn wait_for_data(&mut self, timeout: Duration) -> io::Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.pending()? > 0 {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if self.pending()? == 0 && !self.wait_for_data(self.idle_gap)? {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        self.serial.read_exact(&mut byte)?;
        Ok(Some(byte[0]))
    }

    fn discard_input(&mut self) -> io::Result<usize> {
        // clear all incoming serial to avoid data collision
        let mut discarded = 0;
        loop {
            let pending = self.pending()?;
            if pending == 0 {
                break;
            }
            log::trace!("Got {pending} pending bytes");
            let mut buf = vec![0; pending as usize];
            discarded += self.serial.read(&mut buf)?;
        }
        Ok(discarded)
    }
}
