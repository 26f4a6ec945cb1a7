//! A bounded FIFO for handing events from interrupt handlers to tasks.
//!
//! ```
//! use rtlab_sync::queue::EventQueue;
//!
//! static QUEUE: EventQueue<u8, 4> = EventQueue::new();
//!
//! let (tx, mut rx) = QUEUE.split().unwrap();
//!
//! // From an interrupt handler.
//! assert_eq!(tx.try_send(1), Ok(false));
//!
//! assert_eq!(rx.try_recv(), Some(1));
//! assert!(QUEUE.split().is_err());
//! ```

use core::cell::{RefCell, UnsafeCell};
use core::future::{poll_fn, Future};
use core::mem::MaybeUninit;
use core::pin::Pin;
use core::task::{Context, Poll};

use critical_section::Mutex;
use heapless::Deque;
use portable_atomic::{AtomicBool, AtomicU8, Ordering};
use rtlab_common::wait_list::{Parked, WaitList};
use rtlab_common::waker_registration::WakerRegistration;
use rtlab_time::{Monotonic, TimeoutError};

/// A statically allocated multi-producer, single-consumer queue of `N` items.
///
/// Items are moved into one of `N` slots outside of any critical section, only the slot indexes
/// travel through the (short) critical sections.
pub struct EventQueue<T, const N: usize> {
    // Slot indexes ready to be filled by a sender.
    freeq: Mutex<RefCell<Deque<u8, N>>>,
    // Slot indexes ready to be read by the receiver, in send order.
    readyq: Mutex<RefCell<Deque<u8, N>>>,
    slots: [UnsafeCell<MaybeUninit<T>>; N],
    receiver_waker: WakerRegistration,
    // Senders waiting for a free slot. Never non-empty while `freeq` has one.
    senders: WaitList<SlotWaiter>,
    split: AtomicBool,
}

unsafe impl<T: Send, const N: usize> Send for EventQueue<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for EventQueue<T, N> {}

/// The queue was already split into its sender and receiver.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadySplit;

impl core::fmt::Display for AlreadySplit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("queue already split")
    }
}

/// No free slot, the item is handed back.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(PartialEq, Eq)]
pub struct QueueFull<T>(pub T);

impl<T> core::fmt::Debug for QueueFull<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("QueueFull(..)")
    }
}

impl<T, const N: usize> Default for EventQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> EventQueue<T, N> {
    const _CHECK: () = assert!(N > 0 && N < 256, "a queue holds between 1 and 255 items");

    /// Create an empty queue.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::_CHECK;

        Self {
            freeq: Mutex::new(RefCell::new(Deque::new())),
            readyq: Mutex::new(RefCell::new(Deque::new())),
            slots: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
            receiver_waker: WakerRegistration::new(),
            senders: WaitList::new(),
            split: AtomicBool::new(false),
        }
    }

    /// Split the queue into its (cloneable) sender and its receiver.
    ///
    /// This succeeds exactly once per queue.
    pub fn split(&self) -> Result<(QueueSender<'_, T, N>, QueueReceiver<'_, T, N>), AlreadySplit> {
        critical_section::with(|cs| {
            if self.split.swap(true, Ordering::AcqRel) {
                return Err(AlreadySplit);
            }

            let mut freeq = self.freeq.borrow_ref_mut(cs);
            for idx in 0..N as u8 {
                // Cannot fail, the deque has room for exactly `N` indexes.
                let _ = freeq.push_back(idx);
            }

            Ok((QueueSender(self), QueueReceiver(self)))
        })
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.readyq.borrow_ref(cs).len())
    }

    /// `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` if every slot holds an item or is being filled.
    pub fn is_full(&self) -> bool {
        critical_section::with(|cs| {
            self.split.load(Ordering::Relaxed) && self.freeq.borrow_ref(cs).is_empty()
        })
    }

    fn pop_free(&self) -> Option<u8> {
        critical_section::with(|cs| self.freeq.borrow_ref_mut(cs).pop_front())
    }

    /// Fill slot `idx` and make it visible to the receiver. Returns `true` if the receiver was
    /// woken.
    fn commit(&self, idx: u8, val: T) -> bool {
        // SAFETY: `idx` came from the free queue, nobody else touches this slot until it is
        // pushed to the ready queue below.
        unsafe { (*self.slots[idx as usize].get()).write(val) };

        critical_section::with(|cs| {
            // Cannot fail, there are never more than `N` indexes in flight.
            let _ = self.readyq.borrow_ref_mut(cs).push_back(idx);
        });

        self.receiver_waker.wake()
    }

    /// Give a slot back. The first waiting sender gets it directly, otherwise it is free again.
    fn release_slot(&self, idx: u8) {
        critical_section::with(|cs| {
            let handed = self.senders.pop_front_with(|waiter| {
                waiter.slot.store(idx, Ordering::Relaxed);
                waiter.waker.wake();
            });

            if handed.is_none() {
                let _ = self.freeq.borrow_ref_mut(cs).push_back(idx);
            }
        })
    }
}

impl<T, const N: usize> Drop for EventQueue<T, N> {
    fn drop(&mut self) {
        let readyq = self.readyq.get_mut().get_mut();
        while let Some(idx) = readyq.pop_front() {
            // SAFETY: every index in the ready queue points at an initialized slot.
            unsafe { self.slots[idx as usize].get_mut().assume_init_drop() };
        }
    }
}

/// Sending half of an [`EventQueue`].
pub struct QueueSender<'q, T, const N: usize>(&'q EventQueue<T, N>);

impl<T, const N: usize> Clone for QueueSender<'_, T, N> {
    fn clone(&self) -> Self {
        Self(self.0)
    }
}

impl<T, const N: usize> core::fmt::Debug for QueueSender<'_, T, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "QueueSender")
    }
}

impl<'q, T, const N: usize> QueueSender<'q, T, N> {
    /// Send without waiting. Callable from interrupt handlers.
    ///
    /// Fails if the queue is full or other senders are already waiting for room. On success,
    /// returns `true` if this woke the receiving task.
    pub fn try_send(&self, val: T) -> Result<bool, QueueFull<T>> {
        let idx = critical_section::with(|_| {
            if self.0.senders.is_empty() {
                self.0.pop_free()
            } else {
                None
            }
        });

        match idx {
            Some(idx) => Ok(self.0.commit(idx, val)),
            None => Err(QueueFull(val)),
        }
    }

    /// Send, waiting for as long as the queue is full.
    pub async fn send(&self, val: T) {
        let idx = Reserve::new(self.0).await;
        self.0.commit(idx, val);
    }

    /// Send, waiting at most `timeout` for room. The item is handed back on timeout.
    pub async fn send_timeout<M: Monotonic>(
        &self,
        val: T,
        timeout: M::Duration,
    ) -> Result<(), QueueFull<T>> {
        match M::timeout_after(timeout, Reserve::new(self.0)).await {
            Ok(idx) => {
                self.0.commit(idx, val);
                Ok(())
            }
            Err(TimeoutError) => Err(QueueFull(val)),
        }
    }

    /// `true` if every slot is taken.
    pub fn is_full(&self) -> bool {
        self.0.is_full()
    }

    /// `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

const NO_SLOT: u8 = u8::MAX;

/// A sender waiting for room, and the slot it was handed.
struct SlotWaiter {
    waker: WakerRegistration,
    slot: AtomicU8,
}

impl SlotWaiter {
    fn take_slot(&self) -> Option<u8> {
        match self.slot.swap(NO_SLOT, Ordering::Relaxed) {
            NO_SLOT => None,
            idx => Some(idx),
        }
    }
}

/// Waits for a free slot in FIFO order of the waiting senders.
struct Reserve<'q, T, const N: usize> {
    queue: &'q EventQueue<T, N>,
    parked: Parked<'q, SlotWaiter>,
    reserved: bool,
}

impl<'q, T, const N: usize> Reserve<'q, T, N> {
    fn new(queue: &'q EventQueue<T, N>) -> Self {
        Self {
            queue,
            parked: Parked::new(&queue.senders),
            reserved: false,
        }
    }
}

impl<T, const N: usize> Future for Reserve<'_, T, N> {
    type Output = u8;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<u8> {
        // SAFETY: `parked` is never moved out of `self`.
        let this = unsafe { self.get_unchecked_mut() };
        let mut parked = unsafe { Pin::new_unchecked(&mut this.parked) };
        let queue = this.queue;

        let idx = critical_section::with(|_| {
            if parked.was_released() {
                // The releaser moved a slot into our link, it never went through `freeq`.
                return parked
                    .link()
                    .and_then(|link| link.value().take_slot())
                    .or_else(|| queue.pop_free());
            }

            if let Some(link) = parked.link().filter(|link| link.is_queued()) {
                link.value().waker.register(cx.waker());
                return None;
            }

            if queue.senders.is_empty() {
                if let Some(idx) = queue.pop_free() {
                    return Some(idx);
                }
            }

            let waiter = SlotWaiter {
                waker: WakerRegistration::new(),
                slot: AtomicU8::new(NO_SLOT),
            };
            waiter.waker.register(cx.waker());
            parked.as_mut().enqueue(waiter);

            None
        });

        match idx {
            Some(idx) => {
                this.reserved = true;
                Poll::Ready(idx)
            }
            None => Poll::Pending,
        }
    }
}

impl<T, const N: usize> Drop for Reserve<'_, T, N> {
    fn drop(&mut self) {
        // We were handed a slot but went away without using it, pass it on.
        if !self.reserved && self.parked.was_released() {
            if let Some(idx) = self.parked.link().and_then(|link| link.value().take_slot()) {
                self.queue.release_slot(idx);
            }
        }
    }
}

/// Receiving half of an [`EventQueue`].
pub struct QueueReceiver<'q, T, const N: usize>(&'q EventQueue<T, N>);

impl<T, const N: usize> core::fmt::Debug for QueueReceiver<'_, T, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "QueueReceiver")
    }
}

impl<T, const N: usize> QueueReceiver<'_, T, N> {
    /// Take the oldest item, if there is one.
    pub fn try_recv(&mut self) -> Option<T> {
        let idx = critical_section::with(|cs| self.0.readyq.borrow_ref_mut(cs).pop_front())?;

        // SAFETY: the index came from the ready queue, so the slot is initialized and owned by
        // the receiver until it goes back to the free queue.
        let val = unsafe { (*self.0.slots[idx as usize].get()).assume_init_read() };
        self.0.release_slot(idx);

        Some(val)
    }

    /// Take the oldest item, waiting for one if the queue is empty.
    pub async fn recv(&mut self) -> T {
        poll_fn(|cx| {
            self.0.receiver_waker.register(cx.waker());

            match self.try_recv() {
                Some(val) => Poll::Ready(val),
                None => Poll::Pending,
            }
        })
        .await
    }

    /// Like [`QueueReceiver::recv`], waiting at most `timeout`.
    pub async fn recv_timeout<M: Monotonic>(
        &mut self,
        timeout: M::Duration,
    ) -> Result<T, TimeoutError> {
        M::timeout_after(timeout, self.recv()).await
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` if every slot is taken.
    pub fn is_full(&self) -> bool {
        self.0.is_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cassette::Cassette;
    use core::pin::pin;

    #[test]
    fn fifo_and_capacity() {
        static QUEUE: EventQueue<u32, 3> = EventQueue::new();
        let (tx, mut rx) = QUEUE.split().unwrap();

        assert!(rx.is_empty());
        for i in 0..3 {
            assert!(!tx.is_full());
            tx.try_send(i).unwrap();
        }
        assert!(tx.is_full());
        assert_eq!(tx.try_send(3), Err(QueueFull(3)));

        for i in 0..3 {
            assert_eq!(rx.try_recv(), Some(i));
        }
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn split_only_once() {
        static QUEUE: EventQueue<u8, 2> = EventQueue::new();

        assert!(QUEUE.split().is_ok());
        assert_eq!(QUEUE.split().err(), Some(AlreadySplit));
    }

    #[test]
    fn try_send_reports_woken_receiver() {
        static QUEUE: EventQueue<u8, 2> = EventQueue::new();
        let (tx, mut rx) = QUEUE.split().unwrap();

        assert_eq!(tx.try_send(1), Ok(false));
        assert_eq!(rx.try_recv(), Some(1));

        let recv = pin!(rx.recv());
        let mut recv = Cassette::new(recv);
        assert!(recv.poll_on().is_none());

        assert_eq!(tx.try_send(2), Ok(true));
        assert_eq!(recv.poll_on(), Some(2));
    }

    #[test]
    fn waiting_senders_are_served_in_order() {
        static QUEUE: EventQueue<u8, 1> = EventQueue::new();
        let (tx, mut rx) = QUEUE.split().unwrap();

        tx.try_send(0).unwrap();

        let first = pin!(tx.send(1));
        let mut first = Cassette::new(first);
        let second = pin!(tx.send(2));
        let mut second = Cassette::new(second);
        assert!(first.poll_on().is_none());
        assert!(second.poll_on().is_none());

        // Waiting senders block the interrupt path.
        assert_eq!(tx.try_send(9), Err(QueueFull(9)));

        assert_eq!(rx.try_recv(), Some(0));
        assert!(second.poll_on().is_none());
        assert!(first.poll_on().is_some());

        assert_eq!(rx.try_recv(), Some(1));
        assert!(second.poll_on().is_some());
        assert_eq!(rx.try_recv(), Some(2));
    }

    #[test]
    fn freed_slot_goes_to_the_waiting_sender() {
        static QUEUE: EventQueue<u8, 1> = EventQueue::new();
        let (tx, mut rx) = QUEUE.split().unwrap();

        tx.try_send(0).unwrap();

        let waiting = pin!(tx.send(1));
        let mut waiting = Cassette::new(waiting);
        assert!(waiting.poll_on().is_none());

        assert_eq!(rx.try_recv(), Some(0));

        // A sender arriving after the slot was freed, polled before the waiting one.
        let late = pin!(tx.send(2));
        let mut late = Cassette::new(late);
        assert!(late.poll_on().is_none());
        assert_eq!(tx.try_send(3), Err(QueueFull(3)));

        assert!(waiting.poll_on().is_some());
        assert_eq!(rx.try_recv(), Some(1));

        assert!(late.poll_on().is_some());
        assert_eq!(rx.try_recv(), Some(2));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn cancelled_sender_passes_its_turn_on() {
        static QUEUE: EventQueue<u8, 1> = EventQueue::new();
        let (tx, mut rx) = QUEUE.split().unwrap();

        tx.try_send(0).unwrap();

        let second = pin!(tx.send(2));
        let mut second = Cassette::new(second);
        {
            let first = pin!(tx.send(1));
            let mut first = Cassette::new(first);
            assert!(first.poll_on().is_none());
            assert!(second.poll_on().is_none());

            assert_eq!(rx.try_recv(), Some(0));
        }

        assert!(second.poll_on().is_some());
        assert_eq!(rx.try_recv(), Some(2));
    }

    #[test]
    fn dropping_the_queue_drops_queued_items() {
        use std::rc::Rc;

        let item = Rc::new(());
        {
            let queue: EventQueue<Rc<()>, 2> = EventQueue::new();
            let (tx, _rx) = queue.split().unwrap();
            tx.try_send(item.clone()).unwrap();
            assert_eq!(Rc::strong_count(&item), 2);
        }
        assert_eq!(Rc::strong_count(&item), 1);
    }
}
