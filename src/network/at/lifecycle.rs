//! Connection lifecycle state machine.
//!
//! The lifecycle walks the co-processor from "just powered up, mode unknown"
//! to a transparent TCP tunnel to the broker:
//!
//! ```text
//! Disconnected -> WiFiAssociating -> WiFiAssociated -> ServerConnecting
//!              -> ServerConnected -> SubscriptionPending -> Ready
//! ```
//!
//! The state only moves forward, or back to `Disconnected` in one step. The
//! lifecycle never retries association or connection on its own; that is the
//! job of [`RetryPolicy`](crate::retry::RetryPolicy) in the task driving it.

use super::channel::CommandChannel;
use super::command::{join_access_point, start_tcp};
use super::mode::{LinkMode, ModeController};
use super::{ECHO_OFF, OK, PROBE, START_SEND, TRANSPARENT_TRANSFER};
use crate::config::{LinkOptions, StepPolicy};
use crate::network::buffer::RxBuffer;
use crate::network::error::Error;
use crate::network::{Delay, Write};

/// Connectivity milestones, in the order they are reached.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    /// Nothing established.
    Disconnected,
    /// Association with the access point is in progress.
    WiFiAssociating,
    /// Joined the access point.
    WiFiAssociated,
    /// Opening the TCP session to the broker.
    ServerConnecting,
    /// Socket open and the link transparent.
    ServerConnected,
    /// Topic subscriptions are being issued.
    SubscriptionPending,
    /// Every wanted topic is subscribed.
    Ready,
}

/// Status flags for display collaborators.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStatus {
    /// The co-processor has joined the access point.
    pub wifi_associated: bool,
    /// The TCP session to the broker is open.
    pub server_connected: bool,
}

/// Drives the co-processor through association and socket establishment.
///
/// # Examples
///
/// ```rust,no_run
/// use atcloud::config::LinkOptions;
/// use atcloud::network::at::{CommandChannel, ConnectionLifecycle, ConnectionState};
/// use atcloud::network::buffer::SharedResponseBuffer;
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
/// static RX: SharedResponseBuffer<256> = SharedResponseBuffer::new();
///
/// let channel = CommandChannel::new(Uart, RtosDelay, &RX);
/// let mut lifecycle = ConnectionLifecycle::new(channel, LinkOptions::default());
///
/// lifecycle.associate_wifi("ElevatedNetwork.lt", "798798798")?;
/// lifecycle.connect_server("bemfa.com", 8344)?;
/// assert_eq!(lifecycle.state(), ConnectionState::ServerConnected);
/// # Ok::<(), atcloud::network::error::Error>(())
/// ```
#[derive(Debug)]
pub struct ConnectionLifecycle<T, D, B> {
    link: ModeController<T, D, B>,
    state: ConnectionState,
    status: LinkStatus,
    options: LinkOptions,
}

impl<T, D, B> ConnectionLifecycle<T, D, B>
where
    T: Write,
    D: Delay,
    B: RxBuffer,
{
    /// Start a lifecycle over a fresh channel.
    pub fn new(channel: CommandChannel<T, D, B>, options: LinkOptions) -> Self {
        Self {
            link: ModeController::with_escape_timeout(channel, options.timeouts.escape_ms),
            state: ConnectionState::Disconnected,
            status: LinkStatus::default(),
            options,
        }
    }

    /// Start a lifecycle over a socket that is already open and transparent,
    /// such as a plain TCP stream on a host.
    pub fn attach_open_socket(channel: CommandChannel<T, D, B>, options: LinkOptions) -> Self {
        Self {
            link: ModeController::transparent(channel),
            state: ConnectionState::ServerConnected,
            status: LinkStatus {
                wifi_associated: true,
                server_connected: true,
            },
            options,
        }
    }

    /// Current milestone.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Status flags.
    pub fn status(&self) -> LinkStatus {
        self.status
    }

    /// Current link mode.
    pub fn mode(&self) -> LinkMode {
        self.link.mode()
    }

    /// Link options in effect.
    pub fn options(&self) -> &LinkOptions {
        &self.options
    }

    /// Clear the receive buffer before starting a fresh session.
    pub fn reset_receive_state(&mut self) {
        self.link.channel().reset_receive_state();
    }

    /// Forget every milestone. The next attempt starts from scratch.
    pub fn disconnect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            info!("link reset from {:?}", self.state);
        }
        self.state = ConnectionState::Disconnected;
        self.status = LinkStatus::default();
    }

    /// Join an access point.
    ///
    /// Escapes transparent mode, probes the co-processor, disables echo,
    /// selects the radio mode and joins. A failed join leaves the lifecycle
    /// in [`ConnectionState::WiFiAssociating`]; a co-processor that does not
    /// answer at all resets it to [`ConnectionState::Disconnected`].
    pub fn associate_wifi(&mut self, ssid: &str, password: &str) -> Result<(), Error> {
        let join = join_access_point(ssid, password)?;
        let timeouts = self.options.timeouts;

        self.disconnect();
        self.advance(ConnectionState::WiFiAssociating);
        info!("associating with {}", ssid);

        // A silent escape is normal when the link was already in command mode.
        let _ = self.link.exit_transparent_mode();

        if let Err(e) = self.probe() {
            warn!("co-processor not answering: {:?}", e);
            self.disconnect();
            return Err(e);
        }

        if let Err(e) = self.step(ECHO_OFF, timeouts.echo_off_ms, self.options.echo_off) {
            self.disconnect();
            return Err(e);
        }

        let wifi_mode = self.options.wifi_mode.command();
        if let Err(e) = self.step(wifi_mode, timeouts.wifi_mode_ms, self.options.wifi_mode_step) {
            self.disconnect();
            return Err(e);
        }

        match self.link.command(&join, OK, timeouts.join_ms) {
            Ok(()) => {
                self.advance(ConnectionState::WiFiAssociated);
                self.status.wifi_associated = true;
                info!("joined {}", ssid);
                Ok(())
            }
            Err(e) => {
                self.status.wifi_associated = false;
                warn!("join {} failed: {:?}", ssid, e);
                Err(e)
            }
        }
    }

    /// Open the TCP session to the broker and switch the link to
    /// transparent mode.
    ///
    /// Only valid once associated (or after a failed connection attempt);
    /// anything else is rejected with [`Error::InvalidState`] before a single
    /// byte is sent.
    pub fn connect_server(&mut self, host: &str, port: u16) -> Result<(), Error> {
        match self.state {
            ConnectionState::WiFiAssociated | ConnectionState::ServerConnecting => {}
            state => {
                warn!("connect refused in state {:?}", state);
                return Err(Error::InvalidState);
            }
        }
        let start = start_tcp(host, port)?;

        if self.state == ConnectionState::WiFiAssociated {
            self.advance(ConnectionState::ServerConnecting);
        }
        self.status.server_connected = false;
        info!("connecting to {}:{}", host, port);

        match self.open_tunnel(&start) {
            Ok(()) => {
                self.link.enter_transparent_mode();
                self.advance(ConnectionState::ServerConnected);
                self.status.server_connected = true;
                info!("tunnel to {} open", host);
                Ok(())
            }
            Err(e) => {
                warn!("connect to {} failed: {:?}", host, e);
                Err(e)
            }
        }
    }

    /// Send a transparent payload and wait for `expected` (any reply when
    /// `None`), handing the reply to `on_match`.
    ///
    /// Rejected with [`Error::InvalidState`] unless the socket is open and the
    /// link transparent.
    pub fn payload<R>(
        &mut self,
        payload: &str,
        expected: Option<&str>,
        timeout_ms: u32,
        on_match: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, Error> {
        if self.state < ConnectionState::ServerConnected {
            warn!("payload refused in state {:?}", self.state);
            return Err(Error::InvalidState);
        }
        self.link.payload(payload, expected, timeout_ms, on_match)
    }

    /// Enter [`ConnectionState::SubscriptionPending`].
    pub(crate) fn begin_subscriptions(&mut self) -> Result<(), Error> {
        match self.state {
            ConnectionState::ServerConnected => {
                self.advance(ConnectionState::SubscriptionPending);
                Ok(())
            }
            ConnectionState::SubscriptionPending => Ok(()),
            state => {
                warn!("handshake refused in state {:?}", state);
                Err(Error::InvalidState)
            }
        }
    }

    /// Every subscription was acknowledged.
    pub(crate) fn mark_ready(&mut self) {
        if self.state == ConnectionState::SubscriptionPending {
            self.advance(ConnectionState::Ready);
        }
    }

    pub(crate) fn channel(&mut self) -> &mut CommandChannel<T, D, B> {
        self.link.channel()
    }

    /// Release the channel.
    pub fn into_channel(self) -> CommandChannel<T, D, B> {
        self.link.into_channel()
    }

    fn probe(&mut self) -> Result<(), Error> {
        let attempts = self.options.probe_attempts.max(1);
        let mut result = Err(Error::Timeout);
        for attempt in 1..=attempts {
            result = self.link.command(PROBE, OK, self.options.timeouts.probe_ms);
            if result.is_ok() {
                break;
            }
            debug!("probe {}/{} unanswered", attempt, attempts);
        }
        result
    }

    fn step(&mut self, command: &str, timeout_ms: u32, policy: StepPolicy) -> Result<(), Error> {
        match self.link.command(command, OK, timeout_ms) {
            Ok(()) => Ok(()),
            Err(e) if policy == StepPolicy::Tolerate => {
                warn!("{} failed ({:?}), continuing", command.trim_end(), e);
                Ok(())
            }
            Err(e) => {
                warn!("{} failed: {:?}", command.trim_end(), e);
                Err(e)
            }
        }
    }

    fn open_tunnel(&mut self, start: &str) -> Result<(), Error> {
        let timeouts = self.options.timeouts;
        self.link
            .command(TRANSPARENT_TRANSFER, OK, timeouts.transfer_mode_ms)?;
        self.link.command(start, OK, timeouts.connect_ms)?;
        self.link.command(START_SEND, OK, timeouts.start_send_ms)
    }

    fn advance(&mut self, next: ConnectionState) {
        debug_assert!(next >= self.state);
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

impl<T, D, B> Delay for ConnectionLifecycle<T, D, B>
where
    D: Delay,
{
    fn delay_ms(&mut self, ms: u32) {
        self.link.delay_ms(ms);
    }
}
