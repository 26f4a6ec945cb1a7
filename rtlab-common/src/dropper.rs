//! Scope guards.

use core::mem::ManuallyDrop;

/// Runs a closure when dropped, unless defused.
///
/// Futures use it to undo a half finished operation when they are cancelled.
pub struct OnDrop<F: FnOnce()> {
    f: ManuallyDrop<F>,
}

impl<F: FnOnce()> OnDrop<F> {
    /// Arm a guard running `f` on drop.
    pub fn new(f: F) -> Self {
        Self {
            f: ManuallyDrop::new(f),
        }
    }

    /// Disarm the guard without running the closure.
    pub fn defuse(self) {
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the closure is dropped exactly once here.
        unsafe { ManuallyDrop::drop(&mut this.f) }
    }
}

impl<F: FnOnce()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        // SAFETY: the closure is taken once, `drop` runs at most once.
        let f = unsafe { ManuallyDrop::take(&mut self.f) };
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[test]
    fn runs_unless_defused() {
        let hits = Cell::new(0);

        drop(OnDrop::new(|| hits.set(hits.get() + 1)));
        assert_eq!(hits.get(), 1);

        OnDrop::new(|| hits.set(hits.get() + 1)).defuse();
        assert_eq!(hits.get(), 1);
    }
}
