//! Cloud messaging client over the transparent link.

use super::payload::{
    self, TimeFormat, HEARTBEAT, HEARTBEAT_ACK, LINE_END, PUBLISH_ACK, SUBSCRIBE_ACK,
};
use crate::network::at::{ConnectionLifecycle, ConnectionState, LinkStatus};
use crate::network::buffer::RxBuffer;
use crate::network::error::Error;
use crate::network::{Delay, Write};
use heapless::{String, Vec};

/// Largest inbound chunk handed out by [`Client::drain_inbound`].
pub const MAX_INBOUND_LEN: usize = 256;

/// Largest time string returned by [`Client::fetch_time`].
pub const MAX_TIME_LEN: usize = 32;

/// Bytes pushed by the broker, as drained from the receive buffer.
pub type Inbound = Vec<u8, MAX_INBOUND_LEN>;

/// Broker time, uninterpreted.
pub type TimeString = String<MAX_TIME_LEN>;

/// Publish/subscribe client for the broker's text protocol.
///
/// Owns the [`ConnectionLifecycle`] (and through it the whole link), so the
/// association and connection calls are available here too. Payload
/// operations require the tunnel to be open; before that they fail with
/// [`Error::InvalidState`] without transmitting anything.
///
/// # Examples
///
/// ```rust,no_run
/// use atcloud::config::LinkOptions;
/// use atcloud::network::application::cloud::Client;
/// use atcloud::network::at::{CommandChannel, ConnectionLifecycle};
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
/// let mut client = Client::new(ConnectionLifecycle::new(channel, LinkOptions::default()));
///
/// client.associate_wifi("ElevatedNetwork.lt", "798798798")?;
/// client.connect_server("bemfa.com", 8344)?;
/// client.handshake("acct1", &["topicA"])?;
/// client.publish("acct1", "topicA", "#25.5#60")?;
/// # Ok::<(), atcloud::network::error::Error>(())
/// ```
#[derive(Debug)]
pub struct Client<T, D, B> {
    lifecycle: ConnectionLifecycle<T, D, B>,
}

impl<T, D, B> Client<T, D, B>
where
    T: Write,
    D: Delay,
    B: RxBuffer,
{
    /// Wrap a lifecycle.
    pub fn new(lifecycle: ConnectionLifecycle<T, D, B>) -> Self {
        Self { lifecycle }
    }

    /// The lifecycle.
    pub fn lifecycle(&self) -> &ConnectionLifecycle<T, D, B> {
        &self.lifecycle
    }

    /// The lifecycle, mutably.
    pub fn lifecycle_mut(&mut self) -> &mut ConnectionLifecycle<T, D, B> {
        &mut self.lifecycle
    }

    /// Release the lifecycle.
    pub fn into_lifecycle(self) -> ConnectionLifecycle<T, D, B> {
        self.lifecycle
    }

    /// Current milestone.
    pub fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    /// Status flags.
    pub fn status(&self) -> LinkStatus {
        self.lifecycle.status()
    }

    /// Clear the receive buffer before starting a fresh session.
    pub fn reset_receive_state(&mut self) {
        self.lifecycle.reset_receive_state();
    }

    /// See [`ConnectionLifecycle::associate_wifi`].
    pub fn associate_wifi(&mut self, ssid: &str, password: &str) -> Result<(), Error> {
        self.lifecycle.associate_wifi(ssid, password)
    }

    /// See [`ConnectionLifecycle::connect_server`].
    pub fn connect_server(&mut self, host: &str, port: u16) -> Result<(), Error> {
        self.lifecycle.connect_server(host, port)
    }

    /// Subscribe to `topic`.
    pub fn subscribe(&mut self, account: &str, topic: &str) -> Result<(), Error> {
        let request = payload::subscribe(account, topic)?;
        let timeout = self.payload_timeout();
        self.lifecycle
            .payload(&request, Some(SUBSCRIBE_ACK), timeout, |_| ())
    }

    /// Publish `message` on `topic`.
    ///
    /// The assembled payload must fit
    /// [`COMMAND_CAPACITY`](crate::network::at::command::COMMAND_CAPACITY);
    /// otherwise nothing is sent and [`Error::CapacityExceeded`] is returned.
    pub fn publish(&mut self, account: &str, topic: &str, message: &str) -> Result<(), Error> {
        let request = payload::publish(account, topic, message)?;
        let timeout = self.payload_timeout();
        self.lifecycle
            .payload(&request, Some(PUBLISH_ACK), timeout, |_| ())
    }

    /// Keep the socket alive.
    pub fn heartbeat(&mut self) -> Result<(), Error> {
        let timeout = self.payload_timeout();
        self.lifecycle
            .payload(HEARTBEAT, Some(HEARTBEAT_ACK), timeout, |_| ())
    }

    /// Ask the broker for the current time.
    ///
    /// Waits for the whole reply line, so a reply split across several
    /// arrivals is never cut short. The reply is returned trimmed but
    /// otherwise uninterpreted.
    pub fn fetch_time(&mut self, account: &str, format: TimeFormat) -> Result<TimeString, Error> {
        let request = payload::time_request(account, format)?;
        let timeout = self.payload_timeout();
        self.lifecycle.payload(&request, Some(LINE_END), timeout, |reply| -> Result<TimeString, Error> {
            let text = core::str::from_utf8(reply)
                .map_err(|_| Error::ProtocolError)?
                .trim();
            if text.is_empty() {
                return Err(Error::ProtocolError);
            }
            String::try_from(text).map_err(|_| Error::CapacityExceeded)
        })?
    }

    /// Subscribe to every topic in order and declare the link ready.
    ///
    /// Stops at the first subscription that is not acknowledged and returns
    /// its error; the lifecycle then stays in
    /// [`ConnectionState::SubscriptionPending`].
    pub fn handshake<S: AsRef<str>>(&mut self, account: &str, topics: &[S]) -> Result<(), Error> {
        self.lifecycle.begin_subscriptions()?;
        for topic in topics {
            let topic = topic.as_ref();
            if let Err(e) = self.subscribe(account, topic) {
                warn!("subscribe {} failed: {:?}", topic, e);
                return Err(e);
            }
            info!("subscribed {}", topic);
        }
        self.lifecycle.mark_ready();
        Ok(())
    }

    /// Take whatever the broker pushed since the last exchange.
    ///
    /// Never waits. Returns `None` when nothing arrived; otherwise the
    /// receive buffer is emptied and its content (up to
    /// [`MAX_INBOUND_LEN`] bytes) returned as is.
    pub fn drain_inbound(&mut self) -> Option<Inbound> {
        let rx = self.lifecycle.channel().rx_mut();
        if rx.is_empty() {
            return None;
        }
        let inbound = rx.with_contents(|bytes| {
            let kept = bytes.len().min(MAX_INBOUND_LEN);
            if kept < bytes.len() {
                warn!("inbound data truncated to {} bytes", kept);
            }
            Vec::from_slice(&bytes[..kept]).ok()
        });
        rx.reset();
        inbound
    }

    fn payload_timeout(&self) -> u32 {
        self.lifecycle.options().timeouts.payload_ms
    }
}

impl<T, D, B> Delay for Client<T, D, B>
where
    D: Delay,
{
    fn delay_ms(&mut self, ms: u32) {
        self.lifecycle.delay_ms(ms);
    }
}
