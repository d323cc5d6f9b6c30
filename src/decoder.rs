//! Byte-at-a-time frame assembler.
//!
//! The decoder is fed one byte at a time from the transport. Bytes that
//! cannot start a frame are dropped until a `5A A5` header lines up again, so
//! garbage in front of a response does not cost the response itself.

use crate::frame::{self, frame_length, Frame, HEADER, MAX_FRAME_LENGTH, PAYLOAD_OFFSET};
use crate::FrameError;

/// Position of the decoder within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    None,
    Header2,
    Len,
    SrcAddr,
    DstAddr,
    Cmd,
    Arg,
    Payload,
    Crc,
    Ready,
}

/// What to do when the byte stream dries up one byte before the end of the trailer.
///
/// Some BMUs (or the UART in front of them) regularly fail to deliver the final
/// trailer byte before the line goes quiet. `Fill` completes the frame with the
/// given byte and lets the checksum decide; the high trailer byte is `0xFF` for
/// every short frame, which makes `Fill(0xFF)` the useful setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailerRecovery {
    Reject,
    Fill(u8),
}

impl Default for TrailerRecovery {
    fn default() -> Self {
        TrailerRecovery::Fill(0xff)
    }
}

#[derive(Debug)]
pub struct FrameDecoder {
    buffer: [u8; MAX_FRAME_LENGTH],
    position: usize,
    payload_len: u8,
    state: State,
    recovery: TrailerRecovery,
    discarded: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(TrailerRecovery::default())
    }
}

impl FrameDecoder {
    pub fn new(recovery: TrailerRecovery) -> Self {
        Self {
            buffer: [0; MAX_FRAME_LENGTH],
            position: 0,
            payload_len: 0,
            state: State::None,
            recovery,
            discarded: 0,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Number of bytes dropped while searching for a header.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    fn reset(&mut self) {
        self.buffer = [0; MAX_FRAME_LENGTH];
        self.position = 0;
        self.payload_len = 0;
        self.state = State::None;
    }

    fn store(&mut self, byte: u8) -> Result<(), FrameError> {
        if self.position >= MAX_FRAME_LENGTH {
            log::warn!("Frame exceeds {MAX_FRAME_LENGTH} bytes - buffer={:02X?}", self.buffer);
            let declared = self.payload_len;
            self.reset();
            return Err(FrameError::Oversize { declared });
        }
        self.buffer[self.position] = byte;
        self.position += 1;
        Ok(())
    }

    /// Feeds one byte.
    ///
    /// Returns `Ok(Some(frame))` once a frame with a valid checksum is complete,
    /// `Ok(None)` while more bytes are needed. Checksum and size failures are
    /// returned as errors. The decoder is reset after a frame or an error and can
    /// be fed again.
    pub fn push(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match self.state {
            State::None | State::Ready => {
                if byte != HEADER[0] {
                    self.discarded += 1;
                    return Ok(None);
                }
                self.store(byte)?;
                self.state = State::Header2;
            }
            State::Header2 => {
                if byte == HEADER[0] {
                    // the earlier start byte was noise, this one may begin the frame
                    self.discarded += self.position;
                    self.reset();
                    self.store(byte)?;
                    self.state = State::Header2;
                    return Ok(None);
                }
                if byte != HEADER[1] {
                    log::debug!("Invalid second header byte {byte:02X}, resynchronizing");
                    self.discarded += self.position + 1;
                    self.reset();
                    return Ok(None);
                }
                self.store(byte)?;
                self.state = State::Len;
            }
            State::Len => {
                if frame_length(byte) > MAX_FRAME_LENGTH {
                    log::warn!("Declared payload length {byte} exceeds the frame limit");
                    self.reset();
                    return Err(FrameError::Oversize { declared: byte });
                }
                self.store(byte)?;
                self.payload_len = byte;
                self.state = State::SrcAddr;
            }
            State::SrcAddr => {
                self.store(byte)?;
                self.state = State::DstAddr;
            }
            State::DstAddr => {
                self.store(byte)?;
                self.state = State::Cmd;
            }
            State::Cmd => {
                self.store(byte)?;
                self.state = State::Arg;
            }
            State::Arg => {
                self.store(byte)?;
                self.state = if self.payload_len == 0 {
                    State::Crc
                } else {
                    State::Payload
                };
            }
            State::Payload => {
                self.store(byte)?;
                if self.position == PAYLOAD_OFFSET + self.payload_len as usize {
                    self.state = State::Crc;
                }
            }
            State::Crc => {
                self.store(byte)?;
                if self.position == frame_length(self.payload_len) {
                    return self.complete().map(Some);
                }
            }
        }
        Ok(None)
    }

    /// Ends the current decode because the byte source is exhausted.
    ///
    /// A frame missing only its final trailer byte is completed according to
    /// the configured [`TrailerRecovery`]; anything else is an error.
    pub fn finish(&mut self) -> Result<Frame, FrameError> {
        let state = self.state;
        if state == State::Crc && self.position + 1 == frame_length(self.payload_len) {
            if let TrailerRecovery::Fill(fill) = self.recovery {
                log::debug!("Last trailer byte missing, completing frame with {fill:02X}");
                self.store(fill)?;
                return self.complete();
            }
        }
        log::trace!(
            "Stream exhausted in state {state:?} - buffer={:02X?}",
            &self.buffer[..self.position]
        );
        self.reset();
        match state {
            State::None | State::Ready => Err(FrameError::NoHeader),
            state => Err(FrameError::Incomplete { state }),
        }
    }

    fn complete(&mut self) -> Result<Frame, FrameError> {
        self.state = State::Ready;
        let payload_len = self.payload_len;
        let buffer = self.buffer;
        let length = frame_length(payload_len);
        self.reset();

        if frame::verify(&buffer[..length], payload_len) {
            log::trace!("Frame complete: {:02X?}", &buffer[..length]);
            return Ok(Frame::new(buffer, payload_len));
        }
        let expected = frame::expected_checksum(&buffer, payload_len).unwrap_or_default();
        let received = frame::trailer(&buffer, payload_len).unwrap_or_default();
        log::warn!(
            "Invalid checksum - calculated={expected:04X} received={received:04X} buffer={:02X?}",
            &buffer[..length]
        );
        Err(FrameError::Checksum { expected, received })
    }
}

/// Decodes the first valid frame found in `bytes`.
pub fn decode<I>(bytes: I, recovery: TrailerRecovery) -> Result<Frame, FrameError>
where
    I: IntoIterator<Item = u8>,
{
    let mut decoder = FrameDecoder::new(recovery);
    for byte in bytes {
        if let Some(frame) = decoder.push(byte)? {
            return Ok(frame);
        }
    }
    decoder.finish()
}
