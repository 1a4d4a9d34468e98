//! The task that owns the link.
//!
//! A [`Session`] strings the layers together the way a firmware's network
//! task does: wait for the co-processor to boot, bring the link up under a
//! [`RetryPolicy`], subscribe, optionally fetch the broker's time, then
//! service the heartbeat and publish cadence from a periodic [`Session::poll`].
//!
//! ```rust,no_run
//! use atcloud::config::{DeviceConfig, LinkOptions};
//! use atcloud::network::application::cloud::Client;
//! use atcloud::network::at::{CommandChannel, ConnectionLifecycle};
//! use atcloud::network::buffer::SharedResponseBuffer;
//! use atcloud::session::{Message, Session, Telemetry};
//! use core::fmt::Write as _;
//! # struct Uart;
//! # impl atcloud::network::Write for Uart {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct RtosDelay;
//! # impl atcloud::network::Delay for RtosDelay {
//! #     fn delay_ms(&mut self, _ms: u32) {}
//! # }
//! # fn ticks_ms() -> u64 { 0 }
//!
//! struct Sensors;
//! impl Telemetry for Sensors {
//!     fn render(&mut self, topic: &str, message: &mut Message) -> bool {
//!         match topic {
//!             "mydht004" => write!(message, "#{}.{}#{}", 25, 5, 60).is_ok(),
//!             _ => false,
//!         }
//!     }
//! }
//!
//! static RX: SharedResponseBuffer<256> = SharedResponseBuffer::new();
//! static CONFIG: &[u8] = br#"{"wifi":{"ssid":"lab","password":"secret123"},
//!     "broker":{"host":"bemfa.com","port":8344},"account":"acct1",
//!     "subscribe":["mydht004"],"publish":["mydht004"]}"#;
//!
//! let config = DeviceConfig::from_json(CONFIG)?;
//! let channel = CommandChannel::new(Uart, RtosDelay, &RX);
//! let client = Client::new(ConnectionLifecycle::new(channel, LinkOptions::default()));
//! let mut session = Session::new(client, &config);
//!
//! let _time = session.start()?;
//! let mut sensors = Sensors;
//! loop {
//!     if let Some(inbound) = session.poll(ticks_ms(), &mut sensors) {
//!         // hand `inbound` to the application
//! #       let _ = inbound;
//!     }
//! }
//! # Ok::<(), atcloud::network::error::Error>(())
//! ```

use crate::config::DeviceConfig;
use crate::network::application::cloud::{Client, Inbound, TimeFormat, TimeString};
use crate::network::at::LinkStatus;
use crate::network::buffer::RxBuffer;
use crate::network::error::Error;
use crate::network::{Delay, Write};
use crate::retry::RetryPolicy;
use heapless::String;

/// Largest message body rendered for one publish.
pub const MAX_MESSAGE_LEN: usize = 32;

/// Message body handed to [`Telemetry::render`].
pub type Message = String<MAX_MESSAGE_LEN>;

/// Source of the values published on every publish tick.
pub trait Telemetry {
    /// Write the message for `topic` into `message`.
    ///
    /// Return `false` to skip the topic this round.
    fn render(&mut self, topic: &str, message: &mut Message) -> bool;
}

/// When the last heartbeat and publish round went out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    last_heartbeat_ms: Option<u64>,
    last_publish_ms: Option<u64>,
}

impl Cadence {
    /// Time of the last acknowledged heartbeat, or of the first poll.
    pub fn last_heartbeat_ms(&self) -> Option<u64> {
        self.last_heartbeat_ms
    }

    /// Time of the last publish round that got at least one message out,
    /// or of the first poll.
    pub fn last_publish_ms(&self) -> Option<u64> {
        self.last_publish_ms
    }
}

/// Owns the cloud client and drives it for one device configuration.
#[derive(Debug)]
pub struct Session<'c, T, D, B> {
    client: Client<T, D, B>,
    config: &'c DeviceConfig,
    wifi_retry: RetryPolicy,
    server_retry: RetryPolicy,
    cadence: Cadence,
    booted: bool,
}

impl<'c, T, D, B> Session<'c, T, D, B>
where
    T: Write,
    D: Delay,
    B: RxBuffer,
{
    /// Create a session with the default retry schedule for both phases.
    pub fn new(client: Client<T, D, B>, config: &'c DeviceConfig) -> Self {
        Self::with_retry(client, config, RetryPolicy::default(), RetryPolicy::default())
    }

    /// Create a session with explicit retry schedules.
    pub fn with_retry(
        client: Client<T, D, B>,
        config: &'c DeviceConfig,
        wifi_retry: RetryPolicy,
        server_retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            config,
            wifi_retry,
            server_retry,
            cadence: Cadence::default(),
            booted: false,
        }
    }

    /// Bring the link up and subscribe.
    ///
    /// The first call waits out the co-processor's boot delay; later calls
    /// go straight to association.
    ///
    /// Returns only once WiFi and the broker connection are established,
    /// however long that takes. A refused subscription is returned as an
    /// error. On success yields the broker's time when time sync is enabled
    /// and the broker answered.
    ///
    /// Call again to rebuild the session after the caller detects a lost
    /// connection; every subscription is issued anew.
    pub fn start(&mut self) -> Result<Option<TimeString>, Error> {
        let config = self.config;

        if !self.booted {
            self.client.delay_ms(config.boot_delay_ms);
            self.booted = true;
        }
        self.client.reset_receive_state();

        let wifi = &config.wifi;
        self.wifi_retry.run(&mut self.client, "wifi", |client| {
            client.associate_wifi(&wifi.ssid, &wifi.password)
        });

        let broker = &config.broker;
        self.server_retry.run(&mut self.client, "server", |client| {
            client.connect_server(&broker.host, broker.port)
        });

        self.client
            .handshake(&config.account, config.subscribe.as_slice())?;
        self.cadence = Cadence::default();
        info!("session ready");

        if !config.sync_time {
            return Ok(None);
        }
        match self.client.fetch_time(&config.account, TimeFormat::DateTime) {
            Ok(time) => {
                info!("broker time {}", time.as_str());
                Ok(Some(time))
            }
            Err(e) => {
                warn!("time request failed: {:?}", e);
                Ok(None)
            }
        }
    }

    /// Service the session at time `now_ms`.
    ///
    /// Picks up anything the broker pushed, sends a heartbeat when one is due
    /// and runs a publish round on the first call and whenever the publish
    /// interval has elapsed. A failed heartbeat is retried on the next call.
    /// A round where some topics went out counts as done; its failed topics
    /// wait for the next interval. After the first round, a round where every
    /// publish failed is retried on the next call.
    pub fn poll(&mut self, now_ms: u64, telemetry: &mut impl Telemetry) -> Option<Inbound> {
        let config = self.config;
        let inbound = self.client.drain_inbound();

        let last_heartbeat = *self.cadence.last_heartbeat_ms.get_or_insert(now_ms);
        if now_ms.saturating_sub(last_heartbeat) >= secs_to_ms(config.heartbeat_interval_secs) {
            match self.client.heartbeat() {
                Ok(()) => self.cadence.last_heartbeat_ms = Some(now_ms),
                Err(e) => warn!("heartbeat failed: {:?}", e),
            }
        }

        let publish_due = match self.cadence.last_publish_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= secs_to_ms(config.publish_interval_secs),
        };
        if publish_due {
            let first_round = self.cadence.last_publish_ms.is_none();
            if self.publish_round(telemetry) || first_round {
                self.cadence.last_publish_ms = Some(now_ms);
            }
        }

        inbound
    }

    /// The cloud client.
    pub fn client(&self) -> &Client<T, D, B> {
        &self.client
    }

    /// The cloud client, mutably.
    pub fn client_mut(&mut self) -> &mut Client<T, D, B> {
        &mut self.client
    }

    /// Status flags for display.
    pub fn status(&self) -> LinkStatus {
        self.client.status()
    }

    /// Heartbeat and publish markers.
    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Release the client.
    pub fn into_client(self) -> Client<T, D, B> {
        self.client
    }

    fn publish_round(&mut self, telemetry: &mut impl Telemetry) -> bool {
        let config = self.config;
        let mut attempted = false;
        let mut any_sent = false;
        for topic in config.publish.iter() {
            let mut message = Message::new();
            if !telemetry.render(topic.as_str(), &mut message) {
                continue;
            }
            attempted = true;
            match self
                .client
                .publish(&config.account, topic.as_str(), message.as_str())
            {
                Ok(()) => {
                    debug!("published {}", topic.as_str());
                    any_sent = true;
                }
                Err(e) => warn!("publish {} failed: {:?}", topic.as_str(), e),
            }
        }
        any_sent || !attempted
    }
}

fn secs_to_ms(secs: u32) -> u64 {
    u64::from(secs) * 1000
}
