//! Bounded-then-unbounded retry.
//!
//! A connection phase is first attempted a few times with a short pause in
//! between. If that does not work the phase keeps being retried forever at a
//! longer interval: the device has no other way to reach the cloud, so there
//! is nothing to fall back to.

use crate::network::Delay;

/// Retry schedule for one connection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts in the bounded phase.
    pub attempts: u8,
    /// Pause after a failed bounded attempt, in milliseconds.
    pub retry_delay_ms: u32,
    /// Pause before every unbounded attempt, in milliseconds.
    pub backoff_delay_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            retry_delay_ms: 5_000,
            backoff_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds.
    ///
    /// `ctx` is handed to every attempt and provides the delay between them,
    /// which lets `op` borrow the same link the delay lives in. This only
    /// returns once `op` has succeeded.
    ///
    /// ```rust
    /// use atcloud::network::Delay;
    /// use atcloud::retry::RetryPolicy;
    ///
    /// struct Clock(u64);
    /// impl Delay for Clock {
    ///     fn delay_ms(&mut self, ms: u32) { self.0 += ms as u64; }
    /// }
    ///
    /// let mut clock = Clock(0);
    /// let mut failures = 2;
    /// let value = RetryPolicy::default().run(&mut clock, "demo", |_| {
    ///     if failures > 0 { failures -= 1; Err(()) } else { Ok(42) }
    /// });
    /// assert_eq!(value, 42);
    /// assert_eq!(clock.0, 10_000);
    /// ```
    pub fn run<C, T, E>(
        &self,
        ctx: &mut C,
        label: &str,
        mut op: impl FnMut(&mut C) -> Result<T, E>,
    ) -> T
    where
        C: Delay,
    {
        let attempts = self.attempts.max(1);
        for attempt in 1..=attempts {
            info!("{} attempt {}/{}", label, attempt, attempts);
            match op(ctx) {
                Ok(value) => return value,
                Err(_) => {
                    warn!("{} attempt {}/{} failed", label, attempt, attempts);
                    if attempt < attempts {
                        ctx.delay_ms(self.retry_delay_ms);
                    }
                }
            }
        }

        warn!(
            "{} failed {} times, retrying every {} ms",
            label,
            attempts,
            self.backoff_delay_ms
        );
        loop {
            ctx.delay_ms(self.backoff_delay_ms);
            info!("retrying {}", label);
            if let Ok(value) = op(ctx) {
                info!("{} succeeded after backoff", label);
                return value;
            }
        }
    }
}
