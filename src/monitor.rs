//! Request/response orchestration.
//!
//! [`BatteryMonitor`] owns the transport for its whole lifetime; every
//! operation takes `&mut self`, so only one request is ever in flight and
//! replies cannot interleave.

use crate::catalog::{CommandDescriptor, Metric, SNAPSHOT_SEQUENCE};
use crate::decoder::{FrameDecoder, TrailerRecovery};
use crate::frame::Frame;
use crate::snapshot::BatterySnapshot;
use crate::transport::Transport;
use crate::{Error, FrameError};
use std::time::{Duration, Instant};

/// How long to wait for the first byte of a response.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

type Result<T> = std::result::Result<T, Error>;

/// How often a single request is sent before the reading is given up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request; `0` is treated as `1`.
    pub max_attempts: u8,
    /// Pause between two attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            delay: RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self) -> u8 {
        self.max_attempts.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    pub response_timeout: Duration,
    pub retry: RetryPolicy,
    pub trailer_recovery: TrailerRecovery,
    /// Reject responses whose `arg` byte does not echo the requested register.
    pub verify_echo: bool,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            response_timeout: RESPONSE_TIMEOUT,
            retry: RetryPolicy::default(),
            trailer_recovery: TrailerRecovery::default(),
            verify_echo: false,
        }
    }
}

/// Source of the uptime reported in snapshots.
pub trait Clock {
    fn uptime(&self) -> Duration;
}

/// Counts from the moment the clock is created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    started: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

impl<F: Fn() -> Duration> Clock for F {
    fn uptime(&self) -> Duration {
        self()
    }
}

#[derive(Debug)]
pub struct BatteryMonitor<T, C = MonotonicClock> {
    transport: T,
    clock: C,
    options: MonitorOptions,
}

impl<T: Transport> BatteryMonitor<T> {
    pub fn new(transport: T) -> Self {
        Self::with_clock(transport, MonotonicClock::default())
    }
}

impl<T: Transport, C: Clock> BatteryMonitor<T, C> {
    pub fn with_clock(transport: T, clock: C) -> Self {
        Self {
            transport,
            clock,
            options: MonitorOptions::default(),
        }
    }

    pub fn options(&self) -> &MonitorOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: MonitorOptions) {
        log::trace!("set options to {options:?}");
        self.options = options;
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        log::trace!("set response timeout to {timeout:?}");
        self.options.response_timeout = timeout;
    }

    pub fn set_retry(&mut self, retry: RetryPolicy) {
        log::trace!("set retry policy to {retry:?}");
        self.options.retry = retry;
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Runs the full command sequence and assembles a snapshot.
    ///
    /// The first request that fails ends the reading; nothing read so far is
    /// returned. Calling again starts over from the first command.
    pub fn read_snapshot(&mut self) -> Result<BatterySnapshot> {
        let mut snapshot = BatterySnapshot::default();
        for descriptor in SNAPSHOT_SEQUENCE {
            let frame = self.request(descriptor).inspect_err(|err| {
                log::warn!("Reading snapshot aborted: {err}");
            })?;
            snapshot.apply(descriptor.metric, &frame);
        }
        snapshot.power = snapshot.current * snapshot.voltage;
        snapshot.uptime = self.clock.uptime().as_secs();
        log::debug!("snapshot: {snapshot:?}");
        Ok(snapshot)
    }

    /// Like [`Self::read_snapshot`], but a failure is reported in the snapshot's `error` field.
    pub fn poll(&mut self) -> BatterySnapshot {
        self.read_snapshot()
            .unwrap_or_else(|err| BatterySnapshot::failed(&err))
    }

    /// Sends a single catalog request and returns the validated response frame.
    pub fn query(&mut self, metric: Metric) -> Result<Frame> {
        self.request(metric.descriptor())
    }

    fn request(&mut self, descriptor: &CommandDescriptor) -> Result<Frame> {
        let attempts = self.options.retry.attempts();
        let mut attempt = 1;
        loop {
            match self.exchange(descriptor) {
                Ok(frame) => return Ok(frame),
                Err(err) if attempt < attempts => {
                    log::debug!(
                        "Failed try {attempt} of {attempts} reading {}, repeating ({err})",
                        descriptor.metric
                    );
                    std::thread::sleep(self.options.retry.delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One write followed by one decoded response.
    fn exchange(&mut self, descriptor: &CommandDescriptor) -> Result<Frame> {
        let metric = descriptor.metric;
        let stale = self.transport.discard_input()?;
        if stale > 0 {
            log::debug!("Dropped {stale} stale bytes before requesting {metric}");
        }

        log::trace!("request {metric}: {:02X?}", descriptor.request);
        self.transport.write_all(&descriptor.request)?;

        let timeout = self.options.response_timeout;
        if !self.transport.wait_for_data(timeout)? {
            log::debug!("receive timeout reading {metric}");
            return Err(Error::CommunicationTimeout { metric, timeout });
        }

        let corrupted = |source: FrameError| Error::FrameCorruption { metric, source };
        let mut decoder = FrameDecoder::new(self.options.trailer_recovery);
        let frame = loop {
            match self.transport.read_byte()? {
                Some(byte) => {
                    if let Some(frame) = decoder.push(byte).map_err(corrupted)? {
                        break frame;
                    }
                }
                None => break decoder.finish().map_err(corrupted)?,
            }
        };
        if decoder.discarded() > 0 {
            log::debug!(
                "Skipped {} bytes before the {metric} response",
                decoder.discarded()
            );
        }
        self.check_response(descriptor, &frame).map_err(corrupted)?;
        log::trace!("response {metric}: {frame:?}");
        Ok(frame)
    }

    fn check_response(
        &self,
        descriptor: &CommandDescriptor,
        frame: &Frame,
    ) -> std::result::Result<(), FrameError> {
        if self.options.verify_echo && !descriptor.is_answered_by(frame) {
            return Err(FrameError::EchoMismatch {
                expected: descriptor.register,
                received: frame.arg(),
            });
        }
        let expected = descriptor.read_len as usize;
        let received = frame.payload().len();
        if received < expected {
            log::warn!(
                "Invalid payload size - required={expected} received={received} frame={frame:?}"
            );
            return Err(FrameError::ShortPayload { expected, received });
        }
        Ok(())
    }
}
