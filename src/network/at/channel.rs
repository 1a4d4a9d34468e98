//! Send-and-wait primitive.
//!
//! Everything the crate does on the link is one or more *exchanges*: reset the
//! receive buffer, transmit a command, then poll the buffer in small slices
//! until it contains an expected token or the timeout runs out.

use crate::network::buffer::RxBuffer;
use crate::network::error::Error;
use crate::network::{Delay, Write};

/// Time the channel yields between two looks at the receive buffer.
pub const POLL_SLICE_MS: u32 = 1;

/// One command and the reply it waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingExchange<'a> {
    /// Bytes sent verbatim.
    pub command: &'a [u8],
    /// Text the reply must contain. `None` accepts any reply.
    pub expected: Option<&'a [u8]>,
    /// How long to wait for it.
    pub timeout_ms: u32,
}

impl<'a> PendingExchange<'a> {
    /// Exchange waiting for `expected` inside the reply.
    pub fn new(command: &'a str, expected: &'a str, timeout_ms: u32) -> Self {
        Self {
            command: command.as_bytes(),
            expected: Some(expected.as_bytes()),
            timeout_ms,
        }
    }

    /// Exchange that succeeds on any reply at all.
    pub fn any_reply(command: &'a str, timeout_ms: u32) -> Self {
        Self {
            command: command.as_bytes(),
            expected: None,
            timeout_ms,
        }
    }
}

/// The command channel to the co-processor.
///
/// Owns the transmit side and the delay, and consumes the receive buffer.
/// Every operation takes `&mut self`, so at most one exchange can be in
/// flight: the single task owning the channel is the only reader of the
/// buffer.
#[derive(Debug)]
pub struct CommandChannel<T, D, B> {
    transport: T,
    delay: D,
    rx: B,
}

impl<T, D, B> CommandChannel<T, D, B>
where
    T: Write,
    D: Delay,
    B: RxBuffer,
{
    /// Wrap a transport, a delay and the receive buffer.
    pub fn new(transport: T, delay: D, rx: B) -> Self {
        Self {
            transport,
            delay,
            rx,
        }
    }

    /// Send `command` and wait up to `timeout_ms` for a reply containing
    /// `expected` (any reply when `None`).
    ///
    /// The receive buffer is empty when this returns, whatever the outcome.
    pub fn exchange(
        &mut self,
        command: &[u8],
        expected: Option<&[u8]>,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        self.exchange_with(command, expected, timeout_ms, |_| ())
    }

    /// Run a [`PendingExchange`].
    pub fn run(&mut self, pending: PendingExchange<'_>) -> Result<(), Error> {
        self.exchange(pending.command, pending.expected, pending.timeout_ms)
    }

    /// Like [`exchange`](Self::exchange), but hands the matching reply to
    /// `on_match` before the buffer is cleared.
    pub fn exchange_with<R>(
        &mut self,
        command: &[u8],
        expected: Option<&[u8]>,
        timeout_ms: u32,
        on_match: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, Error> {
        self.rx.reset();
        if let Err(e) = self.transmit(command) {
            self.rx.reset();
            return Err(e);
        }

        let mut remaining = timeout_ms;
        loop {
            if self.matches(expected) {
                let out = self.rx.with_contents(on_match);
                self.rx.reset();
                return Ok(out);
            }
            if remaining == 0 {
                break;
            }
            self.delay.delay_ms(POLL_SLICE_MS);
            remaining = remaining.saturating_sub(POLL_SLICE_MS);
        }

        trace!("exchange timed out after {} ms", timeout_ms);
        self.rx.reset();
        Err(Error::Timeout)
    }

    /// Clear the receive buffer before starting a fresh session.
    pub fn reset_receive_state(&mut self) {
        self.rx.reset();
    }

    /// The receive buffer.
    pub fn rx(&self) -> &B {
        &self.rx
    }

    /// The receive buffer, mutably.
    pub fn rx_mut(&mut self) -> &mut B {
        &mut self.rx
    }

    /// Release the transport, delay and buffer.
    pub fn into_parts(self) -> (T, D, B) {
        (self.transport, self.delay, self.rx)
    }

    fn matches(&self, expected: Option<&[u8]>) -> bool {
        if self.rx.is_empty() {
            return false;
        }
        match expected {
            Some(token) => self.rx.contains(token),
            None => true,
        }
    }

    fn transmit(&mut self, mut bytes: &[u8]) -> Result<(), Error> {
        while !bytes.is_empty() {
            match self.transport.write(bytes) {
                Ok(0) | Err(_) => return Err(Error::WriteError),
                Ok(n) => bytes = &bytes[n..],
            }
        }
        self.transport.flush().map_err(|_| Error::WriteError)
    }
}

impl<T, D, B> Delay for CommandChannel<T, D, B>
where
    D: Delay,
{
    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
