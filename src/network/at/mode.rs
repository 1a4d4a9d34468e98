//! Command mode / transparent mode tracking.

use super::channel::CommandChannel;
use super::ESCAPE_SEQUENCE;
use crate::network::buffer::RxBuffer;
use crate::network::error::Error;
use crate::network::{Delay, Write};

/// Default time to wait for any reply after the escape sequence.
pub const ESCAPE_TIMEOUT_MS: u32 = 2000;

/// What the co-processor does with the bytes it receives.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkMode {
    /// Each line is a directive for the co-processor itself.
    Command,
    /// Bytes are forwarded verbatim to and from the open socket.
    Transparent,
}

/// Owns the command channel and the link mode.
///
/// The mode only changes through [`exit_transparent_mode`](Self::exit_transparent_mode)
/// and the crate-internal transition the lifecycle performs after a successful
/// `AT+CIPSEND`. Command-mode directives are refused while the link is known
/// to be transparent, and transparent payloads while it is in command mode.
///
/// The channel is not reachable from outside the crate, so nothing can slip a
/// raw exchange past the mode check:
///
/// ```rust,compile_fail
/// use atcloud::network::at::{CommandChannel, ModeController};
/// use atcloud::network::buffer::ResponseBuffer;
/// # struct Uart;
/// # impl atcloud::network::Write for Uart {
/// #     type Error = ();
/// #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
/// #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
/// # }
/// # struct RtosDelay;
/// # impl atcloud::network::Delay for RtosDelay {
/// #     fn delay_ms(&mut self, _ms: u32) {}
/// # }
///
/// let channel = CommandChannel::new(Uart, RtosDelay, ResponseBuffer::<64>::new());
/// let mut link = ModeController::new(channel);
/// link.channel().exchange(b"AT+CWQAP\r\n", None, 100).ok();
/// ```
#[derive(Debug)]
pub struct ModeController<T, D, B> {
    channel: CommandChannel<T, D, B>,
    mode: LinkMode,
    escape_timeout_ms: u32,
}

impl<T, D, B> ModeController<T, D, B>
where
    T: Write,
    D: Delay,
    B: RxBuffer,
{
    /// Wrap a channel assumed to be in command mode.
    ///
    /// The co-processor may still be transparent from a previous run; the
    /// lifecycle always escapes before its first directive.
    pub fn new(channel: CommandChannel<T, D, B>) -> Self {
        Self::with_escape_timeout(channel, ESCAPE_TIMEOUT_MS)
    }

    /// Like [`new`](Self::new) with a custom escape timeout.
    pub fn with_escape_timeout(channel: CommandChannel<T, D, B>, escape_timeout_ms: u32) -> Self {
        Self {
            channel,
            mode: LinkMode::Command,
            escape_timeout_ms,
        }
    }

    /// Wrap a channel whose socket is already open and transparent.
    pub(crate) fn transparent(channel: CommandChannel<T, D, B>) -> Self {
        Self {
            channel,
            mode: LinkMode::Transparent,
            escape_timeout_ms: ESCAPE_TIMEOUT_MS,
        }
    }

    /// Current link mode.
    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    /// Send the escape sequence and fall back to command mode.
    ///
    /// A co-processor that was already in command mode stays silent, so the
    /// link is in command mode afterwards either way; the result only says
    /// whether anything acknowledged the escape. Calling this repeatedly is
    /// harmless.
    pub fn exit_transparent_mode(&mut self) -> Result<(), Error> {
        let result = self
            .channel
            .exchange(ESCAPE_SEQUENCE.as_bytes(), None, self.escape_timeout_ms);
        self.mode = LinkMode::Command;
        match result {
            Ok(()) => info!("left transparent mode"),
            Err(e) => debug!("no reply to escape sequence: {:?}", e),
        }
        result
    }

    /// Record that the co-processor accepted `AT+CIPSEND` and is now
    /// forwarding bytes to the socket.
    pub(crate) fn enter_transparent_mode(&mut self) {
        self.mode = LinkMode::Transparent;
    }

    /// Issue a command-mode directive.
    pub fn command(&mut self, command: &str, expected: &str, timeout_ms: u32) -> Result<(), Error> {
        if self.mode != LinkMode::Command {
            warn!("refusing directive while transparent");
            return Err(Error::InvalidState);
        }
        trace!("> {}", command.trim_end());
        self.channel
            .exchange(command.as_bytes(), Some(expected.as_bytes()), timeout_ms)
    }

    /// Send transparent traffic and wait for `expected` (any reply when
    /// `None`), handing the reply to `on_match`.
    pub fn payload<R>(
        &mut self,
        payload: &str,
        expected: Option<&str>,
        timeout_ms: u32,
        on_match: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, Error> {
        if self.mode != LinkMode::Transparent {
            warn!("refusing payload in command mode");
            return Err(Error::InvalidState);
        }
        trace!("> {}", payload);
        self.channel.exchange_with(
            payload.as_bytes(),
            expected.map(str::as_bytes),
            timeout_ms,
            on_match,
        )
    }

    /// The underlying channel.
    pub(crate) fn channel(&mut self) -> &mut CommandChannel<T, D, B> {
        &mut self.channel
    }

    /// Release the channel.
    pub fn into_channel(self) -> CommandChannel<T, D, B> {
        self.channel
    }
}

impl<T, D, B> Delay for ModeController<T, D, B>
where
    D: Delay,
{
    fn delay_ms(&mut self, ms: u32) {
        self.channel.delay_ms(ms);
    }
}
