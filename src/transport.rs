use std::io;
use std::time::Duration;

/// Duplex byte channel to the BMU.
///
/// Reads never block unboundedly: [`Transport::wait_for_data`] waits at most the
/// given timeout and [`Transport::read_byte`] only returns bytes the channel
/// already has (or is about to have, within an implementation-defined gap).
pub trait Transport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Blocks until at least one byte can be read or `timeout` elapses.
    ///
    /// Returns `false` on timeout.
    fn wait_for_data(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Next received byte, or `None` once the channel has gone quiet.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Drops whatever is still pending, typically a late reply to an earlier request.
    fn discard_input(&mut self) -> io::Result<usize> {
        let mut discarded = 0;
        while self.read_byte()?.is_some() {
            discarded += 1;
        }
        Ok(discarded)
    }
}
