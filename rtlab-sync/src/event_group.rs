//! A group of 32 event flags that tasks can wait on.
//!
//! Any context may set or clear flags. Tasks wait until some or all flags of a mask are set,
//! optionally clearing them on the way out. [`EventGroup::sync`] turns the group into a barrier
//! for a fixed set of participants.

use core::future::poll_fn;
use core::pin::pin;
use core::task::Poll;

use portable_atomic::{AtomicU32, Ordering};
use rtlab_common::wait_list::{Parked, WaitList};
use rtlab_common::waker_registration::WakerRegistration;
use rtlab_time::Monotonic;

const R: Ordering = Ordering::Relaxed;

/// How a waiter wants its mask to be satisfied.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaitMode {
    /// Clear the waited for bits when the wait is satisfied.
    pub clear_on_exit: bool,
    /// Wait for every bit of the mask instead of any of them.
    pub wait_for_all: bool,
}

impl WaitMode {
    /// Any bit of the mask, leave the bits alone.
    pub const ANY: Self = Self {
        clear_on_exit: false,
        wait_for_all: false,
    };

    /// Every bit of the mask, leave the bits alone.
    pub const ALL: Self = Self {
        clear_on_exit: false,
        wait_for_all: true,
    };

    /// The same mode, consuming the bits once satisfied.
    pub const fn clearing(self) -> Self {
        Self {
            clear_on_exit: true,
            ..self
        }
    }

    fn is_satisfied(&self, bits: u32, mask: u32) -> bool {
        if self.wait_for_all {
            bits & mask == mask
        } else {
            bits & mask != 0
        }
    }
}

/// The wait timed out. Holds the bits at that moment.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitsTimeout(pub u32);

struct BitsWaiter {
    waker: WakerRegistration,
    mask: u32,
    mode: WaitMode,
    // Bits seen when this waiter was released.
    seen: AtomicU32,
}

/// 32 event flags with async waiting.
pub struct EventGroup {
    bits: AtomicU32,
    waiters: WaitList<BitsWaiter>,
}

impl Default for EventGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl EventGroup {
    /// A group with every flag cleared.
    pub const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
            waiters: WaitList::new(),
        }
    }

    /// Current flags.
    pub fn get(&self) -> u32 {
        self.bits.load(R)
    }

    /// Set `bits` and release every waiter that is now satisfied.
    ///
    /// Returns the flags after the released waiters cleared theirs.
    pub fn set(&self, bits: u32) -> u32 {
        critical_section::with(|_| self.set_and_release(bits).1)
    }

    /// [`EventGroup::set`] for interrupt handlers. Returns `true` if a task was woken.
    pub fn set_from_isr(&self, bits: u32) -> bool {
        critical_section::with(|_| self.set_and_release(bits).2 > 0)
    }

    /// Clear `bits`, returning the flags as they were before.
    pub fn clear(&self, bits: u32) -> u32 {
        self.bits.fetch_and(!bits, R)
    }

    /// Returns `(seen, remaining, released)`. Must run in a critical section.
    fn set_and_release(&self, bits: u32) -> (u32, u32, usize) {
        let seen = self.bits.fetch_or(bits, R) | bits;
        let mut consumed = 0;

        let released = self.waiters.release_where(|waiter| {
            if !waiter.mode.is_satisfied(seen, waiter.mask) {
                return false;
            }

            waiter.seen.store(seen, R);
            if waiter.mode.clear_on_exit {
                consumed |= waiter.mask;
            }
            waiter.waker.wake();
            true
        });

        let remaining = self.bits.fetch_and(!consumed, R) & !consumed;
        (seen, remaining, released)
    }

    /// Wait until `mask` is satisfied according to `mode`.
    ///
    /// Returns the flags at the moment the wait was satisfied, before any clearing.
    pub async fn wait_bits(&self, mask: u32, mode: WaitMode) -> u32 {
        self.wait_inner(mask, mode, 0).await
    }

    /// Like [`EventGroup::wait_bits`], waiting at most `timeout`.
    pub async fn wait_bits_timeout<M: Monotonic>(
        &self,
        mask: u32,
        mode: WaitMode,
        timeout: M::Duration,
    ) -> Result<u32, BitsTimeout> {
        M::timeout_after(timeout, self.wait_bits(mask, mode))
            .await
            .map_err(|_| BitsTimeout(self.get()))
    }

    /// Rendezvous: set `own` and wait until every bit of `all` is set at once.
    ///
    /// The participant completing the set releases all others in the same critical section,
    /// and the `all` bits are cleared for the next round. Returns the flags seen at that moment.
    pub async fn sync(&self, own: u32, all: u32) -> u32 {
        self.wait_inner(all, WaitMode::ALL.clearing(), own).await
    }

    async fn wait_inner(&self, mask: u32, mode: WaitMode, set_first: u32) -> u32 {
        let mut parked = pin!(Parked::new(&self.waiters));
        let mut first = true;

        poll_fn(|cx| {
            critical_section::with(|_| {
                if parked.was_released() {
                    let seen = parked.link().map_or(0, |link| link.value().seen.load(R));
                    return Poll::Ready(seen);
                }

                if let Some(link) = parked.link().filter(|link| link.is_queued()) {
                    link.value().waker.register(cx.waker());
                    return Poll::Pending;
                }

                if first {
                    first = false;

                    let seen = if set_first != 0 {
                        self.set_and_release(set_first).0
                    } else {
                        self.get()
                    };

                    if mode.is_satisfied(seen, mask) {
                        if mode.clear_on_exit {
                            self.bits.fetch_and(!mask, R);
                        }
                        return Poll::Ready(seen);
                    }
                }

                let waiter = BitsWaiter {
                    waker: WakerRegistration::new(),
                    mask,
                    mode,
                    seen: AtomicU32::new(0),
                };
                waiter.waker.register(cx.waker());
                parked.as_mut().enqueue(waiter);

                Poll::Pending
            })
        })
        .await
    }
}
