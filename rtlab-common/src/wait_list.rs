//! An intrusive FIFO of parked waiters.
//!
//! The links live inside the futures that are waiting, so the list never allocates. A link is
//! pinned for as long as it is in a list and is removed again when its owner is dropped, see
//! [`Parked`].

use core::marker::PhantomPinned;
use core::pin::Pin;
use core::ptr::null_mut;

use portable_atomic::{AtomicBool, AtomicPtr, Ordering};

const R: Ordering = Ordering::Relaxed;

/// A doubly linked FIFO list of [`WaitLink`]s.
///
/// Atomicity comes from short [`critical_section`]s; the list is not lock free but can be
/// used from interrupt handlers.
pub struct WaitList<T> {
    head: AtomicPtr<WaitLink<T>>,
    tail: AtomicPtr<WaitLink<T>>,
}

impl<T> Default for WaitList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WaitList<T> {
    /// Create an empty list.
    pub const fn new() -> Self {
        Self {
            head: AtomicPtr::new(null_mut()),
            tail: AtomicPtr::new(null_mut()),
        }
    }

    /// `true` if nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.head.load(R).is_null()
    }

    /// Append `link` to the back of the list.
    ///
    /// # Safety
    ///
    /// The link must stay alive and in place until it has been removed from the list, either by
    /// [`WaitLink::remove_from`] or by being released.
    pub unsafe fn push(&self, link: Pin<&WaitLink<T>>) {
        critical_section::with(|_| {
            let link = link.get_ref();
            let ptr = link as *const WaitLink<T> as *mut WaitLink<T>;
            let tail = self.tail.load(R);

            link.released.store(false, R);
            link.queued.store(true, R);
            link.next.store(null_mut(), R);
            link.prev.store(tail, R);

            // SAFETY: every pointer in the list comes from a live, pinned link.
            match unsafe { tail.as_ref() } {
                Some(tail_ref) => tail_ref.next.store(ptr, R),
                None => self.head.store(ptr, R),
            }
            self.tail.store(ptr, R);
        })
    }

    /// Release the first waiter and run `f` on its value.
    pub fn pop_front_with<F, O>(&self, f: F) -> Option<O>
    where
        F: FnOnce(&T) -> O,
    {
        critical_section::with(|_| {
            // SAFETY: every pointer in the list comes from a live, pinned link.
            let head = unsafe { self.head.load(R).as_ref() }?;
            self.detach(head);
            head.released.store(true, R);

            Some(f(&head.value))
        })
    }

    /// Release every waiter for which `f` returns `true`, front to back.
    ///
    /// The whole scan happens in one critical section, so all released waiters observe the same
    /// state. Returns the number of released waiters.
    pub fn release_where<F>(&self, mut f: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        critical_section::with(|_| {
            let mut released = 0;
            let mut cursor = self.head.load(R);

            // SAFETY: every pointer in the list comes from a live, pinned link.
            while let Some(link) = unsafe { cursor.as_ref() } {
                let next = link.next.load(R);

                if f(&link.value) {
                    self.detach(link);
                    link.released.store(true, R);
                    released += 1;
                }

                cursor = next;
            }

            released
        })
    }

    /// Visit every waiter front to back without releasing anyone.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&T),
    {
        critical_section::with(|_| {
            let mut cursor = self.head.load(R);

            // SAFETY: every pointer in the list comes from a live, pinned link.
            while let Some(link) = unsafe { cursor.as_ref() } {
                f(&link.value);
                cursor = link.next.load(R);
            }
        })
    }

    /// Unlink `link` from this list. Must be called in a critical section with a queued link.
    fn detach(&self, link: &WaitLink<T>) {
        let prev = link.prev.load(R);
        let next = link.next.load(R);

        // SAFETY: neighbours are live links of this list.
        match unsafe { prev.as_ref() } {
            Some(prev_ref) => prev_ref.next.store(next, R),
            None => self.head.store(next, R),
        }
        match unsafe { next.as_ref() } {
            Some(next_ref) => next_ref.prev.store(prev, R),
            None => self.tail.store(prev, R),
        }

        link.next.store(null_mut(), R);
        link.prev.store(null_mut(), R);
        link.queued.store(false, R);
    }
}

/// One entry of a [`WaitList`].
pub struct WaitLink<T> {
    value: T,
    next: AtomicPtr<WaitLink<T>>,
    prev: AtomicPtr<WaitLink<T>>,
    queued: AtomicBool,
    released: AtomicBool,
    _pin: PhantomPinned,
}

impl<T> WaitLink<T> {
    /// Create a link that is not in any list yet.
    pub const fn new(value: T) -> Self {
        Self {
            value,
            next: AtomicPtr::new(null_mut()),
            prev: AtomicPtr::new(null_mut()),
            queued: AtomicBool::new(false),
            released: AtomicBool::new(false),
            _pin: PhantomPinned,
        }
    }

    /// The value carried by this link.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// `true` while the link sits in a list.
    pub fn is_queued(&self) -> bool {
        self.queued.load(R)
    }

    /// `true` if another context removed this link through `pop_front_with` or
    /// `release_where`.
    pub fn is_released(&self) -> bool {
        self.released.load(R)
    }

    /// Remove this link from `list` if it is still queued.
    pub fn remove_from(&self, list: &WaitList<T>) {
        critical_section::with(|_| {
            if self.is_queued() {
                list.detach(self);
            }
        })
    }
}

/// Pinned storage for a waiter's link, unlinked on drop.
///
/// Keep it pinned on the waiting future's stack (`core::pin::pin!`) and call
/// [`Parked::enqueue`] to get in line.
pub struct Parked<'l, T> {
    list: &'l WaitList<T>,
    link: Option<WaitLink<T>>,
    _pin: PhantomPinned,
}

impl<'l, T> Parked<'l, T> {
    /// Empty storage that is not waiting on `list` yet.
    pub const fn new(list: &'l WaitList<T>) -> Self {
        Self {
            list,
            link: None,
            _pin: PhantomPinned,
        }
    }

    /// The current link, if one was ever enqueued.
    pub fn link(&self) -> Option<&WaitLink<T>> {
        self.link.as_ref()
    }

    /// `true` while waiting in the list.
    pub fn is_waiting(&self) -> bool {
        self.link.as_ref().is_some_and(WaitLink::is_queued)
    }

    /// `true` if the last enqueued link was released by someone else.
    pub fn was_released(&self) -> bool {
        self.link.as_ref().is_some_and(WaitLink::is_released)
    }

    /// Get in line at the back of the list carrying `value`.
    ///
    /// Does nothing and returns `false` if a link of this storage is still waiting.
    pub fn enqueue(self: Pin<&mut Self>, value: T) -> bool {
        critical_section::with(|_| {
            if self.is_waiting() {
                return false;
            }

            // SAFETY: the link is never moved out of `self`, which is pinned.
            let this = unsafe { self.get_unchecked_mut() };
            let link = this.link.insert(WaitLink::new(value));

            // SAFETY: `link` is pinned through `self` and `Drop` removes it from the list
            // before the storage is invalidated.
            unsafe { this.list.push(Pin::new_unchecked(link)) };

            true
        })
    }
}

impl<T> Drop for Parked<'_, T> {
    fn drop(&mut self) {
        if let Some(link) = &self.link {
            link.remove_from(self.list);
        }
    }
}
