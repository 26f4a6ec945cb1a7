//! Single-slot waker storage.

use core::cell::RefCell;
use core::task::Waker;

use critical_section::Mutex;

/// A waker slot guarded by a critical section.
///
/// Only one task can be registered at a time. Registering a waker for a different task wakes
/// the previous one so it can re-register if it is still interested.
pub struct WakerRegistration {
    waker: Mutex<RefCell<Option<Waker>>>,
}

impl Default for WakerRegistration {
    fn default() -> Self {
        Self::new()
    }
}

impl WakerRegistration {
    /// Create an empty registration.
    pub const fn new() -> Self {
        Self {
            waker: Mutex::new(RefCell::new(None)),
        }
    }

    /// Register `new_waker`, replacing any previous one.
    pub fn register(&self, new_waker: &Waker) {
        let displaced = critical_section::with(|cs| {
            let mut slot = self.waker.borrow_ref_mut(cs);
            match slot.as_ref() {
                Some(current) if current.will_wake(new_waker) => None,
                _ => slot.replace(new_waker.clone()),
            }
        });

        if let Some(old) = displaced {
            old.wake();
        }
    }

    /// Wake the registered task, if any. Returns `true` if a task was woken.
    pub fn wake(&self) -> bool {
        let waker = critical_section::with(|cs| self.waker.borrow_ref_mut(cs).take());

        match waker {
            Some(waker) => {
                waker.wake();
                true
            }
            None => false,
        }
    }

    /// `true` if a waker is currently registered.
    pub fn is_registered(&self) -> bool {
        critical_section::with(|cs| self.waker.borrow_ref(cs).is_some())
    }
}
