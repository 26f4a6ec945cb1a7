//! A generic timer queue for async executors.

use core::future::{poll_fn, Future};
use core::pin::pin;
use core::task::Poll;

use futures_util::future::{select, Either};
use portable_atomic::{AtomicBool, Ordering};
use rtlab_common::wait_list::{Parked, WaitList};
use rtlab_common::waker_registration::WakerRegistration;

use crate::TimeoutError;

mod backend;
mod tick_type;
pub use backend::TimerQueueBackend;
pub use tick_type::TimerQueueTicks;

/// A task sleeping until `release_at`.
struct Sleeper<Ticks> {
    release_at: Ticks,
    waker: WakerRegistration,
}

/// A generic timer queue for async executors.
///
/// # Blocking
///
/// Sleepers are kept in an unsorted intrusive list and every timer interrupt scans it inside a
/// global critical section, so the lock is held for O(n) time. That is fine for the handful of
/// debounce windows and delays an application keeps in flight.
///
/// # Safety
///
/// The links live on the async stacks of the sleeping tasks and are removed on `drop` or when
/// the deadline passes. Do not call `mem::forget` on an awaited delay.
pub struct TimerQueue<Backend: TimerQueueBackend> {
    sleepers: WaitList<Sleeper<Backend::Ticks>>,
    initialized: AtomicBool,
}

impl<Backend: TimerQueueBackend> Default for TimerQueue<Backend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Backend: TimerQueueBackend> TimerQueue<Backend> {
    /// Make a new queue.
    pub const fn new() -> Self {
        Self {
            sleepers: WaitList::new(),
            initialized: AtomicBool::new(false),
        }
    }

    /// Forwards the `Monotonic::now()` method.
    #[inline(always)]
    pub fn now(&self) -> Backend::Ticks {
        Backend::now()
    }

    /// Takes the initialized backend to initialize the queue.
    pub fn initialize(&self, backend: Backend) {
        self.initialized.store(true, Ordering::SeqCst);

        // Don't run drop on `Backend`
        core::mem::forget(backend);
    }

    /// `true` once [`TimerQueue::initialize`] ran.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }

    /// Call this in the interrupt handler of the hardware timer supporting the monotonic.
    ///
    /// Wakes every sleeper whose deadline passed and programs the compare register for the next
    /// one.
    pub fn on_monotonic_interrupt(&self) {
        Backend::clear_compare_flag();
        Backend::on_interrupt();

        loop {
            let now = Backend::now();
            self.sleepers.release_where(|sleeper| {
                let due = now.is_at_least(sleeper.release_at);
                if due {
                    sleeper.waker.wake();
                }
                due
            });

            match self.next_deadline() {
                Some(instant) => {
                    Backend::enable_timer();
                    Backend::set_compare(instant);

                    if Backend::now().is_at_least(instant) {
                        // The next deadline passed while we were handling this one.
                        continue;
                    }

                    break;
                }
                None => {
                    Backend::disable_timer();

                    break;
                }
            }
        }
    }

    /// The earliest deadline of all sleepers.
    fn next_deadline(&self) -> Option<Backend::Ticks> {
        let mut next: Option<Backend::Ticks> = None;
        self.sleepers.for_each(|sleeper| {
            next = Some(match next {
                Some(current) => current.earliest(sleeper.release_at),
                None => sleeper.release_at,
            });
        });
        next
    }

    /// Number of tasks currently sleeping on this queue.
    pub fn sleepers(&self) -> usize {
        let mut count = 0;
        self.sleepers.for_each(|_| count += 1);
        count
    }

    /// Delay for at least some duration of time.
    ///
    /// Waits one tick longer than `duration`, since a timer has an uncertainty of one period
    /// and waiting "at least" has to compensate for that.
    pub async fn delay(&self, duration: Backend::Ticks) {
        self.delay_until(self.deadline_after(duration)).await
    }

    /// Delay to some specific time instant.
    pub async fn delay_until(&self, instant: Backend::Ticks) {
        if !self.is_initialized() {
            panic!(
                "The timer queue is not initialized with a monotonic, you need to run `initialize`"
            );
        }

        let mut parked = pin!(Parked::new(&self.sleepers));

        poll_fn(|cx| {
            let enqueued = critical_section::with(|_| {
                if Backend::now().is_at_least(instant) || parked.was_released() {
                    return None;
                }

                match parked.link() {
                    Some(link) if link.is_queued() => {
                        link.value().waker.register(cx.waker());
                        Some(false)
                    }
                    _ => {
                        let sleeper = Sleeper {
                            release_at: instant,
                            waker: WakerRegistration::new(),
                        };
                        sleeper.waker.register(cx.waker());
                        Some(parked.as_mut().enqueue(sleeper))
                    }
                }
            });

            match enqueued {
                None => Poll::Ready(()),
                Some(new_sleeper) => {
                    if new_sleeper {
                        Backend::pend_interrupt();
                    }
                    Poll::Pending
                }
            }
        })
        .await
    }

    /// Timeout at a specific time.
    pub async fn timeout_at<F: Future>(
        &self,
        instant: Backend::Ticks,
        future: F,
    ) -> Result<F::Output, TimeoutError> {
        let future = pin!(future);
        let deadline = pin!(self.delay_until(instant));

        match select(future, deadline).await {
            Either::Left((output, _)) => Ok(output),
            Either::Right(((), _)) => Err(TimeoutError),
        }
    }

    /// Timeout after at least a specific duration.
    pub async fn timeout_after<F: Future>(
        &self,
        duration: Backend::Ticks,
        future: F,
    ) -> Result<F::Output, TimeoutError> {
        self.timeout_at(self.deadline_after(duration), future).await
    }

    fn deadline_after(&self, duration: Backend::Ticks) -> Backend::Ticks {
        let now = Backend::now();
        let deadline = now.wrapping_add(duration);
        if deadline != now {
            deadline.wrapping_add(Backend::Ticks::ONE_TICK)
        } else {
            deadline
        }
    }
}
