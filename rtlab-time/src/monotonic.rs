//! Glue between the generic [`TimerQueue`](crate::TimerQueue) and the [`Monotonic`] trait.

use crate::{timer_queue::TimerQueueBackend, Monotonic, TimeoutError};

/// A [`Monotonic`] that is backed by a [`TimerQueue`](crate::TimerQueue).
///
/// Implementing this trait is all a clock has to do, the [`Monotonic`] methods follow from it.
pub trait TimerQueueBasedMonotonic {
    /// The backend owning the timer queue.
    type Backend: TimerQueueBackend;

    /// Points in time of this clock.
    type Instant: TimerQueueBasedInstant<Ticks = <Self::Backend as TimerQueueBackend>::Ticks>
        + core::ops::Add<Self::Duration, Output = Self::Instant>
        + core::ops::Sub<Self::Duration, Output = Self::Instant>
        + core::ops::Sub<Self::Instant, Output = Self::Duration>;

    /// Spans of time of this clock.
    type Duration: TimerQueueBasedDuration<Ticks = <Self::Backend as TimerQueueBackend>::Ticks>;
}

impl<T: TimerQueueBasedMonotonic> Monotonic for T {
    type Instant = T::Instant;
    type Duration = T::Duration;

    fn now() -> Self::Instant {
        Self::Instant::from_ticks(T::Backend::timer_queue().now())
    }

    fn millis(ms: u32) -> Self::Duration {
        Self::Duration::from_millis(ms)
    }

    async fn delay(duration: Self::Duration) {
        T::Backend::timer_queue().delay(duration.ticks()).await
    }

    async fn delay_until(instant: Self::Instant) {
        T::Backend::timer_queue().delay_until(instant.ticks()).await
    }

    async fn timeout_at<F: core::future::Future>(
        instant: Self::Instant,
        future: F,
    ) -> Result<F::Output, TimeoutError> {
        T::Backend::timer_queue()
            .timeout_at(instant.ticks(), future)
            .await
    }

    async fn timeout_after<F: core::future::Future>(
        duration: Self::Duration,
        future: F,
    ) -> Result<F::Output, TimeoutError> {
        T::Backend::timer_queue()
            .timeout_after(duration.ticks(), future)
            .await
    }
}

/// An instant usable by a [`TimerQueueBasedMonotonic`].
pub trait TimerQueueBasedInstant: Ord + Copy {
    /// Raw tick type.
    type Ticks;
    /// Build an instant from raw ticks.
    fn from_ticks(ticks: Self::Ticks) -> Self;
    /// Raw ticks of this instant.
    fn ticks(self) -> Self::Ticks;
}

/// A duration usable by a [`TimerQueueBasedMonotonic`].
pub trait TimerQueueBasedDuration: Copy {
    /// Raw tick type.
    type Ticks;
    /// Raw ticks of this duration.
    fn ticks(self) -> Self::Ticks;
    /// The duration closest to `ms` milliseconds at this clock's rate.
    fn from_millis(ms: u32) -> Self;
}

macro_rules! fugit_ticks {
    ($($t:ty),*) => {
        $(
            impl<const NOM: u32, const DENOM: u32> TimerQueueBasedInstant
                for fugit::Instant<$t, NOM, DENOM>
            {
                type Ticks = $t;
                fn from_ticks(ticks: $t) -> Self {
                    Self::from_ticks(ticks)
                }
                fn ticks(self) -> $t {
                    Self::ticks(&self)
                }
            }

            impl<const NOM: u32, const DENOM: u32> TimerQueueBasedDuration
                for fugit::Duration<$t, NOM, DENOM>
            {
                type Ticks = $t;
                fn ticks(self) -> $t {
                    Self::ticks(&self)
                }
                fn from_millis(ms: u32) -> Self {
                    Self::millis(ms as $t)
                }
            }
        )*
    };
}

fugit_ticks!(u32, u64);
