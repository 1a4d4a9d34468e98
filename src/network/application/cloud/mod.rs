//! Text publish/subscribe protocol for the cloud broker.
//!
//! Once the AT link is transparent, every byte written goes straight to the
//! broker's TCP socket. The broker speaks a small `key=value&key=value`
//! dialect and acknowledges each request with a fixed token that is matched
//! by substring, since its replies are not strictly delimited:
//!
//! | Request | Payload                                      | Acknowledgement |
//! |---------|----------------------------------------------|-----------------|
//! | Heartbeat | `cmd=0&msg=ping`                           | `cmd=0&res=1`   |
//! | Subscribe | `cmd=1&uid=<account>&topic=<topic>`        | `cmd=1&res=1`   |
//! | Publish   | `cmd=2&uid=<account>&topic=<topic>&msg=<m>`| `cmd=2&res=1`   |
//! | Time      | `cmd=7&uid=<account>&type=<n>`             | the time itself |
//!
//! Messages published by others on a subscribed topic arrive unsolicited and
//! are picked up with [`Client::drain_inbound`]; [`InboundMessage::parse`]
//! splits them into fields. No topic demultiplexing happens here.

/// Cloud client and supporting types.
pub mod client;

/// Payload assembly and field parsing.
pub mod payload;

pub use client::{Client, Inbound, TimeString, MAX_INBOUND_LEN, MAX_TIME_LEN};
pub use payload::{fields, InboundMessage, TimeFormat};
