//! Wire layout of a BMU frame and its integrity check.
//!
//! ```text
//! offset  0    1    2    3    4    5    6    7 .. 7+L-1   7+L    8+L
//!        5A   A5   L    src  dst  cmd  arg  payload      crc_lo crc_hi
//! ```
//!
//! The checksum covers `L`, both addresses, `cmd`, `arg` and the payload.
//! It is stored little-endian as `0xFFFF - sum`, where `sum` is a wrapping
//! 16-bit sum of the covered bytes.

use std::fmt;

pub const HEADER: [u8; 2] = [0x5a, 0xa5];
/// Bytes in a frame besides the payload: header, len, src, dst, cmd, arg, checksum.
pub const OVERHEAD: usize = 9;
pub const MAX_FRAME_LENGTH: usize = 64;
pub const MAX_PAYLOAD_LENGTH: usize = MAX_FRAME_LENGTH - OVERHEAD;

pub const LEN_OFFSET: usize = 2;
pub const SRC_OFFSET: usize = 3;
pub const DST_OFFSET: usize = 4;
pub const CMD_OFFSET: usize = 5;
pub const ARG_OFFSET: usize = 6;
pub const PAYLOAD_OFFSET: usize = 7;

/// Total on-wire size of a frame carrying `payload_len` payload bytes.
pub const fn frame_length(payload_len: u8) -> usize {
    payload_len as usize + OVERHEAD
}

/// Computes the trailer value for the covered span (`len` up to the last payload byte).
pub const fn checksum(covered: &[u8]) -> u16 {
    let mut sum: u16 = 0;
    let mut i = 0;
    while i < covered.len() {
        sum = sum.wrapping_add(covered[i] as u16);
        i += 1;
    }
    0xffff - sum
}

/// Reads the little-endian trailer of a frame with `payload_len` payload bytes.
///
/// Returns `None` if `buffer` is too short to hold the trailer.
pub fn trailer(buffer: &[u8], payload_len: u8) -> Option<u16> {
    let end = frame_length(payload_len);
    if buffer.len() < end {
        return None;
    }
    Some(u16::from_le_bytes([buffer[end - 2], buffer[end - 1]]))
}

/// Checksum the frame in `buffer` should carry, or `None` if it is truncated.
pub fn expected_checksum(buffer: &[u8], payload_len: u8) -> Option<u16> {
    let covered_end = PAYLOAD_OFFSET + payload_len as usize;
    buffer
        .get(LEN_OFFSET..covered_end)
        .map(checksum)
}

/// Validates the trailer of an assembled frame.
pub fn verify(buffer: &[u8], payload_len: u8) -> bool {
    match (expected_checksum(buffer, payload_len), trailer(buffer, payload_len)) {
        (Some(expected), Some(received)) => expected == received,
        _ => false,
    }
}

/// A complete, checksum-validated frame.
///
/// The buffer is always [`MAX_FRAME_LENGTH`] bytes; bytes past the end of the
/// frame are zero.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    buffer: [u8; MAX_FRAME_LENGTH],
    payload_len: u8,
}

impl Frame {
    pub(crate) fn new(buffer: [u8; MAX_FRAME_LENGTH], payload_len: u8) -> Self {
        Self {
            buffer,
            payload_len,
        }
    }

    pub fn payload_len(&self) -> u8 {
        self.payload_len
    }

    pub fn src_addr(&self) -> u8 {
        self.buffer[SRC_OFFSET]
    }

    pub fn dst_addr(&self) -> u8 {
        self.buffer[DST_OFFSET]
    }

    pub fn cmd(&self) -> u8 {
        self.buffer[CMD_OFFSET]
    }

    pub fn arg(&self) -> u8 {
        self.buffer[ARG_OFFSET]
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer[PAYLOAD_OFFSET..PAYLOAD_OFFSET + self.payload_len as usize]
    }

    pub fn checksum(&self) -> u16 {
        let end = frame_length(self.payload_len);
        u16::from_le_bytes([self.buffer[end - 2], self.buffer[end - 1]])
    }

    /// Raw frame bytes, header through trailer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..frame_length(self.payload_len)]
    }

    /// Byte at an absolute frame offset; zero past the end of the frame.
    pub fn byte(&self, offset: usize) -> u8 {
        self.buffer.get(offset).copied().unwrap_or(0)
    }

    /// 16-bit value with `offset` as the low byte and `offset + 1` as the high byte.
    pub fn word(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.byte(offset), self.byte(offset + 1)])
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X?}", self.as_bytes())
    }
}
