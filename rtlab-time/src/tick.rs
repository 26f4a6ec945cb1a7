//! A monotonic driven by a periodic tick interrupt.

/// Create a tick driven monotonic named `$name`, counting at `$tick_rate_hz` (default 1 kHz).
///
/// The clock only moves when `$name::tick()` is called, so call it from the periodic timer
/// interrupt of the target. Every tick also services the timer queue, which makes a separate
/// compare interrupt unnecessary. On the host the same clock is cranked by hand with
/// `$name::advance(n)`.
///
/// ```
/// rtlab_time::tick_monotonic!(Mono, 1_000);
///
/// Mono::start();
/// Mono::advance(5);
/// assert_eq!(<Mono as rtlab_time::Monotonic>::now().ticks(), 5);
/// ```
#[macro_export]
macro_rules! tick_monotonic {
    ($name:ident) => {
        $crate::tick_monotonic!($name, 1_000);
    };
    ($name:ident, $tick_rate_hz:expr) => {
        /// A `Monotonic` advanced by a periodic tick.
        pub struct $name;

        const _: () = {
            use $crate::portable_atomic::{AtomicU32, Ordering};

            static TICKS: AtomicU32 = AtomicU32::new(0);
            static QUEUE: $crate::TimerQueue<$name> = $crate::TimerQueue::new();

            impl $name {
                /// Starts the `Monotonic`. Calling it again has no effect.
                pub fn start() {
                    QUEUE.initialize($name);
                }

                /// Advance the clock by one tick and wake the tasks that are due.
                ///
                /// Call this from the tick interrupt.
                pub fn tick() {
                    TICKS.fetch_add(1, Ordering::AcqRel);
                    QUEUE.on_monotonic_interrupt();
                }

                /// Run `ticks` ticks back to back.
                pub fn advance(ticks: u32) {
                    for _ in 0..ticks {
                        Self::tick();
                    }
                }

                /// Number of tasks currently sleeping on this clock.
                pub fn sleepers() -> usize {
                    QUEUE.sleepers()
                }
            }

            impl $crate::TimerQueueBackend for $name {
                type Ticks = u32;

                fn now() -> u32 {
                    TICKS.load(Ordering::Acquire)
                }

                // The queue is serviced on every tick, no compare channel needed.
                fn set_compare(_: u32) {}

                fn clear_compare_flag() {}

                fn pend_interrupt() {}

                fn timer_queue() -> &'static $crate::TimerQueue<Self> {
                    &QUEUE
                }
            }

            impl $crate::TimerQueueBasedMonotonic for $name {
                type Backend = $name;
                type Instant = $crate::fugit::Instant<u32, 1, { $tick_rate_hz }>;
                type Duration = $crate::fugit::Duration<u32, 1, { $tick_rate_hz }>;
            }
        };
    };
}
