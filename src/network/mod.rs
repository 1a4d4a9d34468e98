//! A network abstraction layer for AT-command co-processors
//!
//! This module provides the small set of traits the rest of the crate needs
//! from the platform: a byte sink to transmit on and a cooperative delay to
//! wait with. The receive side is the shared response buffer in [`buffer`],
//! filled asynchronously by the platform's UART/DMA path.
//!

#![deny(unsafe_code)]

/// Common error types for network operations
pub mod error;

/// Shared receive buffer filled by the transport and drained by the core
pub mod buffer;

/// The AT command dialect: command channel, link mode and connection lifecycle
pub mod at;

/// Application protocols carried over the transparent link
pub mod application;

/// Re-exports of common traits
pub mod prelude {
    pub use super::buffer::RxBuffer;
    pub use super::{Delay, Write};
}

/// Transmit side of the link to the co-processor.
pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Queue bytes for transmission, returning how many were accepted
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Cooperative millisecond delay.
///
/// On an RTOS this yields the processor to other tasks for the given time;
/// on a host it sleeps the thread. It must never busy-spin.
pub trait Delay {
    /// Suspend the calling task for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

impl<D: Delay + ?Sized> Delay for &mut D {
    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

impl<W: Write + ?Sized> Write for &mut W {
    type Error = W::Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        (**self).flush()
    }
}
