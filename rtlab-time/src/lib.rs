//! Time-related traits & structs.
//!
//! A [`Monotonic`] is a clock that tasks can sleep on. This crate provides a generic
//! [`TimerQueue`] that turns any hardware counter into one, and [`tick_monotonic!`] which builds
//! a monotonic from a periodic tick interrupt, the way an RTOS tick works. The tick monotonic is
//! also what the host tests use as a hand-cranked clock.

#![no_std]
#![deny(missing_docs)]
#![allow(async_fn_in_trait)]

pub mod monotonic;
mod tick;
pub mod timer_queue;

pub use monotonic::{TimerQueueBasedDuration, TimerQueueBasedInstant, TimerQueueBasedMonotonic};
pub use timer_queue::{TimerQueue, TimerQueueBackend, TimerQueueTicks};

/// Re-export for macros
pub use fugit;
/// Re-export for macros
pub use portable_atomic;

/// This indicates that there was a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutError;

impl core::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("timed out")
    }
}

/// # A monotonic clock / counter definition.
///
/// ## Correctness
///
/// The trait enforces that proper time-math is implemented between `Instant` and `Duration`. This
/// is a requirement on the time library that the user chooses to use.
pub trait Monotonic {
    /// The type for instant, defining an instant in time.
    type Instant: Ord
        + Copy
        + core::ops::Add<Self::Duration, Output = Self::Instant>
        + core::ops::Sub<Self::Duration, Output = Self::Instant>
        + core::ops::Sub<Self::Instant, Output = Self::Duration>;

    /// The type for duration, defining a duration of time.
    type Duration: Copy;

    /// Get the current time.
    fn now() -> Self::Instant;

    /// A duration of `ms` milliseconds on this clock.
    fn millis(ms: u32) -> Self::Duration;

    /// Delay for at least some duration of time.
    async fn delay(duration: Self::Duration);

    /// Delay to some specific time instant.
    async fn delay_until(instant: Self::Instant);

    /// Timeout at a specific time.
    async fn timeout_at<F: core::future::Future>(
        instant: Self::Instant,
        future: F,
    ) -> Result<F::Output, TimeoutError>;

    /// Timeout after at least a specific duration.
    async fn timeout_after<F: core::future::Future>(
        duration: Self::Duration,
        future: F,
    ) -> Result<F::Output, TimeoutError>;
}
