//! A FIFO mutex for tasks sharing one output resource.
//!
//! ```
//! # async fn select<F1, F2>(f1: F1, f2: F2) {}
//! use rtlab_sync::serializer::Serializer;
//!
//! static UART: Serializer<[u8; 4]> = Serializer::new([0; 4]);
//!
//! async fn run() {
//!     let first = async {
//!         UART.lock().await[0] = 1;
//!     };
//!     let second = async {
//!         UART.lock().await[0] = 2;
//!     };
//!
//!     select(first, second).await;
//! }
//! ```

use core::cell::UnsafeCell;
use core::future::Future;
use core::ops::{Deref, DerefMut};
use core::pin::Pin;
use core::task::{Context, Poll};

use portable_atomic::{AtomicBool, Ordering};
use rtlab_common::wait_list::{Parked, WaitList};
use rtlab_common::waker_registration::WakerRegistration;

/// Mutual exclusion over a `T`, granted in the order it was asked for.
///
/// Only tasks can lock it, there is no interrupt variant. The lock is handed directly from the
/// releasing holder to the longest waiting task.
pub struct Serializer<T> {
    waiters: WaitList<WakerRegistration>,
    inner: UnsafeCell<T>,
    locked: AtomicBool,
}

unsafe impl<T: Send> Send for Serializer<T> {}
unsafe impl<T: Send> Sync for Serializer<T> {}

impl<T> Serializer<T> {
    /// Create an unlocked serializer.
    pub const fn new(inner: T) -> Self {
        Self {
            waiters: WaitList::new(),
            inner: UnsafeCell::new(inner),
            locked: AtomicBool::new(false),
        }
    }

    /// Wait for exclusive access to the inner value.
    pub fn lock(&self) -> Acquire<'_, T> {
        Acquire {
            serializer: self,
            parked: Parked::new(&self.waiters),
            acquired: false,
        }
    }

    /// Take the lock if it is free and nobody is queued for it.
    pub fn try_lock(&self) -> Option<SerializerGuard<'_, T>> {
        critical_section::with(|_| {
            if self.waiters.is_empty() && !self.locked.load(Ordering::Relaxed) {
                self.locked.store(true, Ordering::Relaxed);
                Some(SerializerGuard { serializer: self })
            } else {
                None
            }
        })
    }

    /// `true` while some task holds the lock.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    fn unlock(&self) {
        critical_section::with(|_| {
            // The lock stays taken if it was handed over.
            if self
                .waiters
                .pop_front_with(|waker| waker.wake())
                .is_none()
            {
                self.locked.store(false, Ordering::Relaxed);
            }
        })
    }
}

/// Future returned by [`Serializer::lock`].
pub struct Acquire<'a, T> {
    serializer: &'a Serializer<T>,
    parked: Parked<'a, WakerRegistration>,
    acquired: bool,
}

impl<'a, T> Future for Acquire<'a, T> {
    type Output = SerializerGuard<'a, T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // SAFETY: `parked` is never moved out of `self`.
        let this = unsafe { self.get_unchecked_mut() };
        let mut parked = unsafe { Pin::new_unchecked(&mut this.parked) };
        let serializer = this.serializer;

        let acquired = critical_section::with(|_| {
            if parked.was_released() {
                return true;
            }

            if let Some(link) = parked.link().filter(|link| link.is_queued()) {
                link.value().register(cx.waker());
                return false;
            }

            if serializer.waiters.is_empty() && !serializer.locked.load(Ordering::Relaxed) {
                serializer.locked.store(true, Ordering::Relaxed);
                return true;
            }

            let waker = WakerRegistration::new();
            waker.register(cx.waker());
            parked.as_mut().enqueue(waker);
            false
        });

        if acquired {
            this.acquired = true;
            Poll::Ready(SerializerGuard { serializer })
        } else {
            Poll::Pending
        }
    }
}

impl<T> Drop for Acquire<'_, T> {
    fn drop(&mut self) {
        // The lock was handed to us but nobody will ever hold it, pass it on.
        if !self.acquired && self.parked.was_released() {
            self.serializer.unlock();
        }
    }
}

/// Exclusive access to the value of a [`Serializer`]; unlocks on drop.
pub struct SerializerGuard<'a, T> {
    serializer: &'a Serializer<T>,
}

impl<T> Drop for SerializerGuard<'_, T> {
    fn drop(&mut self) {
        self.serializer.unlock();
    }
}

impl<T> Deref for SerializerGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard is the only holder of the lock.
        unsafe { &*self.serializer.inner.get() }
    }
}

impl<T> DerefMut for SerializerGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard is the only holder of the lock.
        unsafe { &mut *self.serializer.inner.get() }
    }
}
