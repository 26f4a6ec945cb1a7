//! DMA paced serial output shared by several tasks.
//!
//! A [`Transmitter`] owns the only transmit buffer and the DMA channel that reads it. A task
//! locks it, formats into the buffer, starts the transfer and sleeps on a completion gate until
//! the DMA interrupt reports back through [`Transmitter::on_transfer_event`]. Only then is the
//! lock released, so the buffer is never rewritten while the hardware still reads it.

use core::fmt;

use heapless::String;
use portable_atomic::{AtomicU32, Ordering};
use rtlab_common::dropper::OnDrop;
use rtlab_sync::gate::{AlreadyGiven, CompletionGate};
use rtlab_sync::serializer::Serializer;

use crate::config::{ErrorPolicy, TransmitConfig};
use crate::error::{TransferError, TransmitError};

/// A DMA channel feeding a serial transmitter.
pub trait DmaChannel {
    /// Why a transfer could not be started.
    type Error: fmt::Debug;

    /// Start sending `bytes` in the background.
    ///
    /// The hardware may keep reading `bytes` after this returns. The caller does not touch the
    /// memory again until the transfer reported back.
    fn start(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Write `bytes` back from the data cache before the DMA reads them. A no-op on parts
    /// without a data cache.
    fn clean_dcache(&mut self, _bytes: &[u8]) {}
}

/// What the DMA interrupt saw.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEvent {
    /// Every byte was handed to the transmitter.
    Complete,
    /// Half of the bytes were handed to the transmitter.
    HalfComplete,
    /// The controller hit a bus error.
    Error,
    /// The transfer was aborted.
    Aborted,
    /// Interrupt without a recognized cause.
    None,
}

/// How the last transfer ended, as handed from the notifier to the transmitting task.
pub type TransferOutcome = Result<(), TransferError>;

/// Counters of everything the notifier observed.
#[derive(Default)]
pub struct TransferFlags {
    issued: AtomicU32,
    completed: AtomicU32,
    errors: AtomicU32,
    aborts: AtomicU32,
    half_complete: AtomicU32,
    unknown: AtomicU32,
    stale: AtomicU32,
    cancelled: AtomicU32,
}

/// A snapshot of [`TransferFlags`].
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferStatus {
    /// Transfers started.
    pub issued: u32,
    /// Completion events.
    pub completed: u32,
    /// Error events.
    pub errors: u32,
    /// Abort events.
    pub aborts: u32,
    /// Half complete events.
    pub half_complete: u32,
    /// Events without a cause.
    pub unknown: u32,
    /// Signals found on the gate before a transfer started, or given while it was still open.
    pub stale: u32,
    /// Transmissions dropped while their transfer was in flight.
    pub cancelled: u32,
}

impl TransferFlags {
    /// All counters at zero.
    pub const fn new() -> Self {
        Self {
            issued: AtomicU32::new(0),
            completed: AtomicU32::new(0),
            errors: AtomicU32::new(0),
            aborts: AtomicU32::new(0),
            half_complete: AtomicU32::new(0),
            unknown: AtomicU32::new(0),
            stale: AtomicU32::new(0),
            cancelled: AtomicU32::new(0),
        }
    }

    fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter.
    pub fn status(&self) -> TransferStatus {
        TransferStatus {
            issued: self.issued.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
            half_complete: self.half_complete.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

struct TxState<D, const N: usize> {
    buf: String<N>,
    dma: D,
}

/// The shared transmit buffer, its DMA channel and the protocol around them.
pub struct Transmitter<D, const N: usize> {
    state: Serializer<TxState<D, N>>,
    gate: CompletionGate<TransferOutcome>,
    flags: TransferFlags,
    config: TransmitConfig,
}

impl<D: DmaChannel, const N: usize> Transmitter<D, N> {
    /// Wrap `dma` with an `N` byte buffer.
    pub const fn new(dma: D, config: TransmitConfig) -> Self {
        Self {
            state: Serializer::new(TxState {
                buf: String::new(),
                dma,
            }),
            gate: CompletionGate::new(),
            flags: TransferFlags::new(),
            config,
        }
    }

    /// Format a message with `f` and send it, waiting until the transfer finished.
    ///
    /// Transmissions of different tasks never overlap and happen in the order the tasks asked.
    /// Returns the number of bytes sent.
    ///
    /// Dropping the returned future while a transfer is in flight leaves the buffer with the
    /// hardware; don't. It is counted in [`TransferStatus::cancelled`].
    pub async fn transmit<F>(&self, f: F) -> Result<usize, TransmitError>
    where
        F: FnOnce(&mut String<N>) -> fmt::Result,
    {
        let mut tx = self.state.lock().await;
        let TxState { buf, dma } = &mut *tx;

        buf.clear();
        if f(buf).is_err() {
            warn!("message does not fit {} bytes", N);
            return Err(TransmitError::Overflow);
        }

        if self.gate.try_take().is_some() {
            warn!("dropping a stale completion");
            TransferFlags::bump(&self.flags.stale);
        }

        let bytes = buf.as_bytes();
        if bytes.is_empty() {
            return Ok(0);
        }

        let mut retries = self.config.retries;

        loop {
            dma.clean_dcache(bytes);
            dma.start(bytes).map_err(|_err| {
                error!("dma start failed");
                TransmitError::Start
            })?;
            TransferFlags::bump(&self.flags.issued);

            let in_flight = OnDrop::new(|| {
                error!("transmit dropped with a transfer in flight");
                TransferFlags::bump(&self.flags.cancelled);
            });
            let outcome = self.gate.take().await;
            in_flight.defuse();

            match outcome {
                Ok(()) => return Ok(bytes.len()),
                Err(_) if retries > 0 => {
                    warn!("transfer failed, {} retries left", retries);
                    retries -= 1;
                }
                Err(err) => return Err(TransmitError::Transfer(err)),
            }
        }
    }

    /// Send `msg` as is.
    pub async fn transmit_str(&self, msg: &str) -> Result<usize, TransmitError> {
        self.transmit(|buf| buf.push_str(msg).map_err(|_| fmt::Error))
            .await
    }

    /// The completion notifier. Call it from the DMA interrupt with what the channel reported.
    ///
    /// Returns `true` if the transmitting task was woken.
    pub fn on_transfer_event(&self, event: TransferEvent) -> bool {
        let flags = &self.flags;

        match event {
            TransferEvent::Complete => {
                TransferFlags::bump(&flags.completed);
                self.open_gate(Ok(()))
            }
            TransferEvent::Error => {
                TransferFlags::bump(&flags.errors);
                self.fail(TransferError::Error)
            }
            TransferEvent::Aborted => {
                TransferFlags::bump(&flags.aborts);
                self.fail(TransferError::Aborted)
            }
            TransferEvent::HalfComplete => {
                TransferFlags::bump(&flags.half_complete);
                false
            }
            TransferEvent::None => {
                TransferFlags::bump(&flags.unknown);
                false
            }
        }
    }

    fn fail(&self, err: TransferError) -> bool {
        match self.config.policy {
            ErrorPolicy::Hold => false,
            ErrorPolicy::Release => self.open_gate(Err(err)),
        }
    }

    fn open_gate(&self, outcome: TransferOutcome) -> bool {
        match self.gate.give_from_isr(outcome) {
            Ok(woken) => woken,
            Err(AlreadyGiven) => {
                TransferFlags::bump(&self.flags.stale);
                false
            }
        }
    }

    /// What the notifier observed so far.
    pub fn status(&self) -> TransferStatus {
        self.flags.status()
    }

    /// `true` while some task owns the buffer.
    pub fn is_busy(&self) -> bool {
        self.state.is_locked()
    }

    /// The configuration in use.
    pub fn config(&self) -> TransmitConfig {
        self.config
    }
}
