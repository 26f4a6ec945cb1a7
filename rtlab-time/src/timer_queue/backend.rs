use super::{TimerQueue, TimerQueueTicks};

/// A backend definition for a monotonic clock/counter.
pub trait TimerQueueBackend: 'static + Sized {
    /// The type for ticks.
    type Ticks: TimerQueueTicks;

    /// Get the current time.
    fn now() -> Self::Ticks;

    /// Set the compare value of the timer interrupt.
    ///
    /// **Note:** This method does not need to handle race conditions of the monotonic, the timer
    /// queue checks this.
    fn set_compare(instant: Self::Ticks);

    /// Clear the compare interrupt flag.
    fn clear_compare_flag();

    /// Pend the timer's interrupt.
    fn pend_interrupt();

    /// Optional. Runs on interrupt before any timer queue handling.
    fn on_interrupt() {}

    /// Optional. Called when the timer queue is not empty, to save power.
    ///
    /// NOTE: This may be called more than once.
    fn enable_timer() {}

    /// Optional. Called when the timer queue is empty, to save power.
    ///
    /// NOTE: This may be called more than once.
    fn disable_timer() {}

    /// Returns a reference to the underlying timer queue.
    fn timer_queue() -> &'static TimerQueue<Self>;
}
