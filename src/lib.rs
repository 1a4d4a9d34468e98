//! # atcloud - AT co-processor cloud link
//!
//! Connects a small device to a text publish/subscribe cloud broker through a
//! WiFi co-processor that speaks an AT-command dialect (ESP8266/ESP32 AT
//! firmware family). The crate handles the link end to end: the send-and-wait
//! command channel, command/transparent mode switching, WiFi association, the
//! TCP tunnel to the broker and the broker's own `key=value` protocol.
//!
//! The platform provides three things: a byte sink to the co-processor, a
//! cooperative delay, and a receive path that appends incoming bytes to a
//! [`SharedResponseBuffer`](network::buffer::SharedResponseBuffer).
//!
//! ## Layers
//!
//! - [`network::at`]: command channel, link mode and connection lifecycle
//! - [`network::application::cloud`]: subscribe, publish, heartbeat and time
//! - [`session`]: the owning task: bring-up under a [`retry`] policy, then
//!   the heartbeat and publish cadence
//! - [`config`]: link options and the deployment's JSON configuration
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! atcloud = { version = "0.1.0", features = ["defmt"] }
//! ```
//!
//! ```rust,no_run
//! use atcloud::config::LinkOptions;
//! use atcloud::network::application::cloud::Client;
//! use atcloud::network::at::{CommandChannel, ConnectionLifecycle};
//! use atcloud::network::buffer::SharedResponseBuffer;
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
//!
//! // Filled from the UART receive interrupt with `RX.fill(bytes)`.
//! static RX: SharedResponseBuffer<256> = SharedResponseBuffer::new();
//!
//! let channel = CommandChannel::new(Uart, RtosDelay, &RX);
//! let mut client = Client::new(ConnectionLifecycle::new(channel, LinkOptions::default()));
//!
//! client.associate_wifi("ElevatedNetwork.lt", "798798798")?;
//! client.connect_server("bemfa.com", 8344)?;
//! client.handshake("acct1", &["mydht004"])?;
//! client.publish("acct1", "mydht004", "#25.5#60")?;
//! # Ok::<(), atcloud::network::error::Error>(())
//! ```
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Log through defmt for embedded debugging
//! - `log`: Log through the `log` facade

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

// Must come first so the logging macros are visible in every module.
mod fmt;

/// Link to the co-processor and the protocols carried over it.
///
/// Contains the platform traits, the shared receive buffer, the AT command
/// layers and the cloud application protocol.
pub mod network;

/// Link options and device configuration.
pub mod config;

/// Retry schedule for connection phases.
pub mod retry;

/// The task that owns and drives the link.
pub mod session;
