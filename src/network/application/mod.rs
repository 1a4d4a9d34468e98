//! # Application Layer Protocols
//!
//! Protocols spoken over the transparent tunnel once the AT link has opened
//! it. Each client owns the link below it and exposes a small, blocking,
//! `Result`-returning API suited to a single firmware task.
//!
//! ## Available Protocols
//!
//! - **[`cloud`]**: the broker's `key=value&...` publish/subscribe/heartbeat
//!   text protocol
//!
//! ## Design Principles
//!
//! - **Transport Agnostic**: work over any [`Write`](crate::network::Write) +
//!   [`Delay`](crate::network::Delay) pair and any
//!   [`RxBuffer`](crate::network::buffer::RxBuffer)
//! - **No-std Compatible**: no heap allocation, fixed-size buffers
//! - **Fail Closed**: payloads that do not fit are rejected, never truncated

/// Text publish/subscribe protocol for the cloud broker.
///
/// Provides subscribe, publish, heartbeat and time requests over the
/// transparent link, plus non-blocking pickup of broker-pushed messages.
pub mod cloud;
