//! Shared receive buffer.
//!
//! The co-processor's replies land in a single fixed-size buffer that the
//! platform's receive path (UART interrupt, DMA idle-line handler, a reader
//! thread on a host) appends to, and that the command channel inspects and
//! resets. The length doubles as a doorbell: non-zero means the transport has
//! written something since the last reset.
//!
//! ```rust
//! use atcloud::network::buffer::{RxBuffer, SharedResponseBuffer};
//!
//! static RX: SharedResponseBuffer<256> = SharedResponseBuffer::new();
//!
//! // Producer side, e.g. from the UART interrupt handler.
//! RX.fill(b"WIFI GOT IP\r\n\r\nOK\r\n");
//!
//! // Consumer side.
//! let rx = &RX;
//! assert!(rx.contains(b"OK"));
//! RX.reset();
//! assert!(RX.is_empty());
//! ```

use core::cell::RefCell;
use critical_section::Mutex;
use heapless::Vec;

/// Default receive buffer size in bytes.
pub const DEFAULT_RX_CAPACITY: usize = 256;

/// Consumer view of the receive buffer.
///
/// This is everything the command channel needs: the doorbell length, a
/// substring test over the accumulated bytes, a view of those bytes and a
/// reset that empties the buffer for the next exchange.
pub trait RxBuffer {
    /// Number of bytes accumulated since the last reset.
    fn len(&self) -> usize;

    /// `true` when nothing arrived since the last reset.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` when the accumulated bytes contain `needle`.
    ///
    /// An empty needle is contained in any buffer.
    fn contains(&self, needle: &[u8]) -> bool;

    /// Run `f` over the accumulated bytes.
    fn with_contents<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R;

    /// Discard everything received so far.
    fn reset(&mut self);
}

/// Returns the offset of the first occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// A fixed-capacity byte accumulator.
#[derive(Debug, Clone, Default)]
pub struct ResponseBuffer<const N: usize> {
    data: Vec<u8, N>,
    overflowed: bool,
}

impl<const N: usize> ResponseBuffer<N> {
    /// Create an empty buffer.
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            overflowed: false,
        }
    }

    /// Append bytes, returning how many fit. Bytes past capacity are dropped
    /// and the buffer remembers that it overflowed until the next reset.
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let room = N - self.data.len();
        let accepted = bytes.len().min(room);
        // `accepted` never exceeds the remaining room.
        let _ = self.data.extend_from_slice(&bytes[..accepted]);
        if accepted < bytes.len() {
            self.overflowed = true;
        }
        accepted
    }

    /// The accumulated bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Whether bytes were dropped since the last reset.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Empty the buffer.
    pub fn clear(&mut self) {
        self.data.clear();
        self.overflowed = false;
    }
}

impl<const N: usize> RxBuffer for ResponseBuffer<N> {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn contains(&self, needle: &[u8]) -> bool {
        find(&self.data, needle).is_some()
    }

    fn with_contents<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.data)
    }

    fn reset(&mut self) {
        self.clear();
    }
}

/// A [`ResponseBuffer`] shared between an interrupt-context producer and the
/// task driving the link.
///
/// Every access goes through a critical section, so the producer never sees a
/// half-reset buffer and the consumer never sees a half-written one. It can be
/// placed in a `static`.
pub struct SharedResponseBuffer<const N: usize = DEFAULT_RX_CAPACITY> {
    inner: Mutex<RefCell<ResponseBuffer<N>>>,
}

impl<const N: usize> SharedResponseBuffer<N> {
    /// Create an empty shared buffer.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(ResponseBuffer::new())),
        }
    }

    /// Producer side: append received bytes. Returns how many were kept.
    pub fn fill(&self, bytes: &[u8]) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).extend(bytes))
    }

    /// Number of bytes accumulated since the last reset.
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).data.len())
    }

    /// `true` when nothing arrived since the last reset.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the producer dropped bytes since the last reset.
    pub fn overflowed(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).overflowed())
    }

    /// Empty the buffer.
    pub fn reset(&self) {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).clear());
    }

    /// Run `f` over the buffer inside a critical section.
    ///
    /// Keep `f` short: the producer is locked out while it runs.
    pub fn with<R>(&self, f: impl FnOnce(&ResponseBuffer<N>) -> R) -> R {
        critical_section::with(|cs| f(&self.inner.borrow_ref(cs)))
    }
}

impl<const N: usize> Default for SharedResponseBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for SharedResponseBuffer<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedResponseBuffer")
            .field("capacity", &N)
            .field("len", &self.len())
            .finish()
    }
}

impl<const N: usize> RxBuffer for &SharedResponseBuffer<N> {
    fn len(&self) -> usize {
        SharedResponseBuffer::<N>::len(*self)
    }

    fn contains(&self, needle: &[u8]) -> bool {
        SharedResponseBuffer::<N>::with(*self, |buf| buf.contains(needle))
    }

    fn with_contents<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        SharedResponseBuffer::<N>::with(*self, |buf| f(buf.as_bytes()))
    }

    fn reset(&mut self) {
        SharedResponseBuffer::<N>::reset(*self)
    }
}
