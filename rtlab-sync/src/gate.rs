//! A binary semaphore carrying a small value, given from interrupt context.

use core::cell::Cell;
use core::future::poll_fn;
use core::task::Poll;

use critical_section::Mutex;
use rtlab_common::waker_registration::WakerRegistration;

/// The gate was already given and not taken yet.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyGiven;

/// A count of zero or one, plus the value it was given with.
///
/// One side (usually an interrupt handler) gives, one task takes.
pub struct CompletionGate<T: Copy> {
    value: Mutex<Cell<Option<T>>>,
    waker: WakerRegistration,
}

impl<T: Copy> Default for CompletionGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> CompletionGate<T> {
    /// A closed gate.
    pub const fn new() -> Self {
        Self {
            value: Mutex::new(Cell::new(None)),
            waker: WakerRegistration::new(),
        }
    }

    /// Open the gate with `value`. Never blocks.
    ///
    /// Returns `true` if the waiting task was woken, or an error if the gate is already open.
    pub fn give_from_isr(&self, value: T) -> Result<bool, AlreadyGiven> {
        critical_section::with(|cs| {
            let slot = self.value.borrow(cs);
            if slot.get().is_some() {
                return Err(AlreadyGiven);
            }
            slot.set(Some(value));
            Ok(())
        })?;

        Ok(self.waker.wake())
    }

    /// Take the value if the gate is open, closing it.
    pub fn try_take(&self) -> Option<T> {
        critical_section::with(|cs| self.value.borrow(cs).take())
    }

    /// `true` if the gate is open.
    pub fn is_given(&self) -> bool {
        critical_section::with(|cs| self.value.borrow(cs).get().is_some())
    }

    /// Wait for the gate to open and take its value.
    pub async fn take(&self) -> T {
        poll_fn(|cx| {
            self.waker.register(cx.waker());

            match self.try_take() {
                Some(value) => Poll::Ready(value),
                None => Poll::Pending,
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cassette::Cassette;
    use core::pin::pin;

    #[test]
    fn given_once_taken_once() {
        let gate = CompletionGate::new();

        assert_eq!(gate.give_from_isr(1u8), Ok(false));
        assert_eq!(gate.give_from_isr(2), Err(AlreadyGiven));
        assert!(gate.is_given());

        assert_eq!(gate.try_take(), Some(1));
        assert_eq!(gate.try_take(), None);
    }

    #[test]
    fn take_waits_for_give() {
        let gate = CompletionGate::new();

        let take = pin!(gate.take());
        let mut take = Cassette::new(take);
        assert!(take.poll_on().is_none());
        assert!(take.poll_on().is_none());

        assert_eq!(gate.give_from_isr('x'), Ok(true));
        assert_eq!(take.poll_on(), Some('x'));
        assert!(!gate.is_given());
    }
}
