use crate::catalog::Metric;
use crate::decoder::State;
use std::time::Duration;

/// Reasons a response could not be turned into a valid frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("checksum mismatch - expected={expected:04X} received={received:04X}")]
    Checksum { expected: u16, received: u16 },
    #[error("declared payload length {declared} exceeds the maximum frame size")]
    Oversize { declared: u8 },
    #[error("stream ended in state {state:?}")]
    Incomplete { state: State },
    #[error("no frame header found")]
    NoHeader,
    #[error("payload too short - expected={expected} received={received}")]
    ShortPayload { expected: usize, received: usize },
    #[error("response echoes register {received:#04X}, requested {expected:#04X}")]
    EchoMismatch { expected: u8, received: u8 },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The BMU did not start answering within the response window.
    #[error("no response reading {metric} within {timeout:?}")]
    CommunicationTimeout { metric: Metric, timeout: Duration },
    /// A response arrived but did not decode into a valid frame.
    #[error("corrupted response reading {metric}: {source}")]
    FrameCorruption {
        metric: Metric,
        #[source]
        source: FrameError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serialport")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl Error {
    /// The catalog command that was in flight when the error occurred.
    pub fn metric(&self) -> Option<Metric> {
        match self {
            Error::CommunicationTimeout { metric, .. } | Error::FrameCorruption { metric, .. } => {
                Some(*metric)
            }
            _ => None,
        }
    }
}
