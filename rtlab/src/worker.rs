//! Tasks turning input events into LED actions and status lines.
//!
//! A [`Worker`] loops through
//! `AwaitEvent -> Process -> AwaitTransmitSlot -> Transmit -> AwaitCompletion -> AwaitEvent`:
//! it takes one event from its [`EventSource`], applies the matching [`Action`], optionally
//! meets the other workers at a [`Barrier`] and reports through the shared [`Transmitter`].

use core::convert::Infallible;
use core::fmt;
use core::future::pending;

use portable_atomic::{AtomicU8, Ordering};
use rtlab_sync::event_group::{EventGroup, WaitMode};
use rtlab_sync::queue::QueueReceiver;

use crate::action::{Action, ActionTable, LedBank};
use crate::error::TransmitError;
use crate::event::{InputEvent, Payload, SourceId};
use crate::transmit::{DmaChannel, Transmitter};

/// Where a worker is in its loop.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Waiting for the next event.
    AwaitEvent,
    /// Applying the action of an event.
    Process,
    /// Waiting for the transmitter.
    AwaitTransmitSlot,
    /// Formatting into the transmit buffer.
    Transmit,
    /// Waiting for the DMA transfer to finish.
    AwaitCompletion,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => WorkerState::Process,
            2 => WorkerState::AwaitTransmitSlot,
            3 => WorkerState::Transmit,
            4 => WorkerState::AwaitCompletion,
            _ => WorkerState::AwaitEvent,
        }
    }
}

/// Shared view of a worker's [`WorkerState`], readable from any context.
pub struct WorkerStatus(AtomicU8);

impl WorkerStatus {
    /// Starts out in [`WorkerState::AwaitEvent`].
    pub const fn new() -> Self {
        Self(AtomicU8::new(WorkerState::AwaitEvent as u8))
    }

    /// The current state.
    pub fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Something a worker can take events from.
pub trait EventSource {
    /// Wait for the next event.
    async fn next_event(&mut self) -> InputEvent;
}

impl<const N: usize> EventSource for QueueReceiver<'_, InputEvent, N> {
    async fn next_event(&mut self) -> InputEvent {
        self.recv().await
    }
}

/// Turns bits of an event group into events of one source.
pub struct BitsSubscription<'g> {
    group: &'g EventGroup,
    bits: u32,
    source: SourceId,
    payload: Payload,
}

impl<'g> BitsSubscription<'g> {
    /// Every time one of `bits` is set, consume them and report a press of `source`.
    pub const fn new(group: &'g EventGroup, bits: u32, source: SourceId, payload: Payload) -> Self {
        Self {
            group,
            bits,
            source,
            payload,
        }
    }
}

impl EventSource for BitsSubscription<'_> {
    async fn next_event(&mut self) -> InputEvent {
        self.group
            .wait_bits(self.bits, WaitMode::ANY.clearing())
            .await;

        InputEvent::pressed(self.source, self.payload.clone())
    }
}

/// A rendezvous of several workers after their action and before their output.
#[derive(Clone, Copy)]
pub struct Barrier<'g> {
    /// Group holding the barrier bits.
    pub group: &'g EventGroup,
    /// The bit of this participant.
    pub own: u32,
    /// The bits of every participant.
    pub all: u32,
}

/// Formats the line a worker reports for an event.
pub trait StatusLine {
    /// Write the line for `event`, which triggered `action`.
    fn format(&self, event: &InputEvent, action: Action, out: &mut dyn fmt::Write) -> fmt::Result;
}

/// `button {id} was pressed-debounce {ms}ms and {label} is changed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressReport {
    /// Debounce period quoted in the line.
    pub debounce_ms: u32,
}

impl StatusLine for PressReport {
    fn format(&self, event: &InputEvent, _: Action, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(
            out,
            "button {} was pressed-debounce {}ms and {} is changed \r\n",
            event.source,
            self.debounce_ms,
            event.payload.as_str()
        )
    }
}

impl<F> StatusLine for F
where
    F: Fn(&InputEvent, Action, &mut dyn fmt::Write) -> fmt::Result,
{
    fn format(&self, event: &InputEvent, action: Action, out: &mut dyn fmt::Write) -> fmt::Result {
        self(event, action, out)
    }
}

/// One event handling task.
pub struct Worker<'a, E, L, D, S, const A: usize, const N: usize> {
    events: E,
    leds: L,
    actions: ActionTable<A>,
    line: S,
    tx: &'a Transmitter<D, N>,
    barrier: Option<Barrier<'a>>,
    status: Option<&'a WorkerStatus>,
}

impl<'a, E, L, D, S, const A: usize, const N: usize> Worker<'a, E, L, D, S, A, N>
where
    E: EventSource,
    L: LedBank,
    D: DmaChannel,
    S: StatusLine,
{
    /// A worker taking events from `events`, driving `leds` and reporting through `tx`.
    pub fn new(
        events: E,
        leds: L,
        actions: ActionTable<A>,
        line: S,
        tx: &'a Transmitter<D, N>,
    ) -> Self {
        Self {
            events,
            leds,
            actions,
            line,
            tx,
            barrier: None,
            status: None,
        }
    }

    /// Meet the other workers at `barrier` before transmitting.
    pub fn with_barrier(mut self, barrier: Barrier<'a>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    /// Publish the loop state to `status`.
    pub fn with_status(mut self, status: &'a WorkerStatus) -> Self {
        self.status = Some(status);
        self
    }

    fn enter(&self, state: WorkerState) {
        if let Some(status) = self.status {
            status.set(state);
        }
    }

    /// The LEDs this worker drives.
    pub fn leds(&mut self) -> &mut L {
        &mut self.leds
    }

    /// Handle exactly one event.
    pub async fn step(&mut self) -> Result<usize, TransmitError> {
        self.enter(WorkerState::AwaitEvent);
        let event = self.events.next_event().await;

        self.enter(WorkerState::Process);
        let action = self.actions.dispatch(event.source, &mut self.leds);
        debug!("btn{} -> {}", event.source.0, action);

        if let Some(barrier) = self.barrier {
            barrier.group.sync(barrier.own, barrier.all).await;
        }

        self.enter(WorkerState::AwaitTransmitSlot);
        let status = self.status;
        let line = &self.line;
        let sent = self
            .tx
            .transmit(|buf| {
                if let Some(status) = status {
                    status.set(WorkerState::Transmit);
                }
                let res = line.format(&event, action, buf);
                if let Some(status) = status {
                    status.set(WorkerState::AwaitCompletion);
                }
                res
            })
            .await;

        self.enter(WorkerState::AwaitEvent);
        sent
    }

    /// Handle `iterations` events. Returns how many of them failed to transmit.
    pub async fn run_for(&mut self, iterations: usize) -> usize {
        let mut failed = 0;

        for _ in 0..iterations {
            if let Err(_err) = self.step().await {
                warn!("status line lost: {}", _err);
                failed += 1;
            }
        }

        failed
    }

    /// Run forever, or handle `limit` events and then idle.
    pub async fn run(&mut self, limit: Option<usize>) -> Infallible {
        match limit {
            Some(iterations) => {
                self.run_for(iterations).await;
                pending().await
            }
            None => loop {
                self.run_for(1).await;
            },
        }
    }
}
