//! Time capability consumed by the control core.
//!
//! The firmware is single-threaded and cooperative: the only scheduling
//! points are the fixed delays taken through this trait (run-loop tick,
//! connection polls, pre-sleep settles).

/// Monotonic millisecond clock plus a blocking delay.
pub trait Clock {
    /// Milliseconds since boot. Wraps only after ~584 million years.
    fn now_ms(&self) -> u64;

    /// Block for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}
