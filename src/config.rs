//! Device and link configuration.
//!
//! [`LinkOptions`] holds the knobs of the AT link itself (timeouts, which
//! housekeeping failures are tolerated, radio mode). [`DeviceConfig`] is what a
//! deployment provides: credentials, broker endpoint, account and topics. It
//! can be embedded as JSON and parsed with [`DeviceConfig::from_json`].
//!
//! ```rust
//! use atcloud::config::DeviceConfig;
//!
//! let json = br#"{
//!     "wifi": { "ssid": "ElevatedNetwork.lt", "password": "798798798" },
//!     "broker": { "host": "bemfa.com", "port": 8344 },
//!     "account": "4af24e3731744508bd519435397e4ab5",
//!     "subscribe": ["mydht004", "myMP25004", "myLUX004"],
//!     "publish": ["mydht004", "myLUX004", "myMP25004"]
//! }"#;
//!
//! let config = DeviceConfig::from_json(json).unwrap();
//! assert_eq!(config.broker.port, 8344);
//! assert_eq!(config.heartbeat_interval_secs, 60);
//! ```

use crate::network::at::command::WifiMode;
use crate::network::error::Error;
use heapless::{String, Vec};
use serde::Deserialize;

/// Maximum number of subscribed or published topics.
pub const MAX_TOPICS: usize = 8;

/// Maximum topic name length.
pub const MAX_TOPIC_LEN: usize = 32;

/// Topic name as stored in the configuration.
pub type Topic = String<MAX_TOPIC_LEN>;

/// What to do when a lifecycle step fails.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepPolicy {
    /// Log the failure and carry on.
    Tolerate,
    /// Give up on the current attempt.
    Abort,
}

/// Reply timeouts of the individual lifecycle steps, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// `+++`
    pub escape_ms: u32,
    /// `AT`
    pub probe_ms: u32,
    /// `ATE0`
    pub echo_off_ms: u32,
    /// `AT+CWMODE`
    pub wifi_mode_ms: u32,
    /// `AT+CWJAP`; covers a real radio handshake.
    pub join_ms: u32,
    /// `AT+CIPMODE`
    pub transfer_mode_ms: u32,
    /// `AT+CIPSTART`; covers a TCP handshake over the internet.
    pub connect_ms: u32,
    /// `AT+CIPSEND`
    pub start_send_ms: u32,
    /// Cloud payloads (subscribe, publish, heartbeat, time).
    pub payload_ms: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            escape_ms: 2000,
            probe_ms: 500,
            echo_off_ms: 500,
            wifi_mode_ms: 500,
            join_ms: 8000,
            transfer_mode_ms: 2000,
            connect_ms: 5000,
            start_send_ms: 3000,
            payload_ms: 1000,
        }
    }
}

/// Options of the AT link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkOptions {
    /// Reply timeouts.
    pub timeouts: Timeouts,
    /// How many times the liveness probe is sent before giving up.
    pub probe_attempts: u8,
    /// Failure handling for `ATE0`. Echo only affects chattiness.
    pub echo_off: StepPolicy,
    /// Failure handling for `AT+CWMODE`. Association needs the right mode.
    pub wifi_mode_step: StepPolicy,
    /// Radio mode to select.
    pub wifi_mode: WifiMode,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            probe_attempts: 3,
            echo_off: StepPolicy::Tolerate,
            wifi_mode_step: StepPolicy::Abort,
            wifi_mode: WifiMode::default(),
        }
    }
}

/// Access point credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WifiCredentials {
    /// Network name.
    pub ssid: String<32>,
    /// Passphrase; empty for open networks.
    #[serde(default)]
    pub password: String<64>,
}

/// Broker endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Broker {
    /// Host name or address.
    pub host: String<64>,
    /// TCP port.
    pub port: u16,
}

/// Everything a deployment needs to reach the cloud.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceConfig {
    /// Access point to join.
    pub wifi: WifiCredentials,
    /// Broker to connect to.
    pub broker: Broker,
    /// Account identifier sent as `uid` with every payload.
    pub account: String<64>,
    /// Topics subscribed during the handshake, in order.
    #[serde(default)]
    pub subscribe: Vec<Topic, MAX_TOPICS>,
    /// Topics published on every publish tick, in order.
    #[serde(default)]
    pub publish: Vec<Topic, MAX_TOPICS>,
    /// Seconds between heartbeats.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u32,
    /// Seconds between publish rounds.
    #[serde(default = "default_publish_interval")]
    pub publish_interval_secs: u32,
    /// Time the co-processor needs after power-up before it answers.
    #[serde(default = "default_boot_delay")]
    pub boot_delay_ms: u32,
    /// Fetch the broker's time once the handshake completes.
    #[serde(default = "default_sync_time")]
    pub sync_time: bool,
}

fn default_heartbeat_interval() -> u32 {
    60
}

fn default_publish_interval() -> u32 {
    15
}

fn default_boot_delay() -> u32 {
    2000
}

fn default_sync_time() -> bool {
    true
}

impl DeviceConfig {
    /// Parse a JSON configuration.
    pub fn from_json(json: &[u8]) -> Result<Self, Error> {
        match serde_json_core::from_slice::<DeviceConfig>(json) {
            Ok((config, _)) => Ok(config),
            Err(_) => {
                error!("device configuration is not valid JSON");
                Err(Error::InvalidConfig)
            }
        }
    }
}
