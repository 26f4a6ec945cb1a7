//! Software debouncing of interrupt driven inputs.
//!
//! The edge interrupt only calls [`DebounceTimer::arm`]. The debounce task, [`DebounceTimer::run`],
//! waits until the line has been quiet for a whole period and then checks that it is still
//! asserted before confirming a single press through a [`ConfirmSink`].

use core::convert::Infallible;
use core::future::poll_fn;
use core::task::Poll;

use embedded_hal::digital::InputPin;
use portable_atomic::{AtomicBool, Ordering};
use rtlab_common::waker_registration::WakerRegistration;
use rtlab_sync::event_group::EventGroup;
use rtlab_sync::queue::QueueSender;
use rtlab_time::Monotonic;

use crate::config::{ActiveLevel, DebounceConfig};
use crate::console::{self, EmergencySerial};
use crate::error::DebounceError;
use crate::event::{InputEvent, Payload, SourceId};

/// A one-shot timer restarted by every edge of one input.
pub struct DebounceTimer {
    source: SourceId,
    armed: AtomicBool,
    waker: WakerRegistration,
}

impl DebounceTimer {
    /// A stopped timer for input `source`.
    pub const fn new(source: SourceId) -> Self {
        Self {
            source,
            armed: AtomicBool::new(false),
            waker: WakerRegistration::new(),
        }
    }

    /// The input this timer debounces.
    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Start or restart the quiet period. Callable from the edge interrupt.
    ///
    /// Returns `true` if the debounce task was woken.
    pub fn arm(&self) -> bool {
        self.armed.store(true, Ordering::Release);
        self.waker.wake()
    }

    /// Arm only if `pin` currently reads asserted.
    pub fn arm_if_asserted<P: InputPin>(&self, pin: &mut P, active: ActiveLevel) -> bool {
        if is_asserted(pin, active) {
            self.arm()
        } else {
            false
        }
    }

    /// Resolves on the next arm.
    async fn armed(&self) {
        poll_fn(|cx| {
            self.waker.register(cx.waker());

            if self.armed.swap(false, Ordering::AcqRel) {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await
    }

    /// The debounce task of this input. Only returns on a fatal error.
    ///
    /// Every time the quiet period ends with `pin` still asserted, exactly one press is handed to
    /// `sink`. When the sink cannot take it, the failure is written to `serial` and returned.
    pub async fn run<M, P, S, C>(
        &self,
        mut pin: P,
        config: DebounceConfig,
        mut sink: S,
        serial: &C,
    ) -> Result<Infallible, DebounceError>
    where
        M: Monotonic,
        P: InputPin,
        S: ConfirmSink,
        C: EmergencySerial + ?Sized,
    {
        let period = M::millis(config.period_ms);
        let send_timeout = M::millis(config.send_timeout_ms);

        loop {
            self.armed().await;

            // Every arm inside the window starts it over.
            while M::timeout_after(period, self.armed()).await.is_ok() {
                trace!("btn{} bounced", self.source.0);
            }

            if !is_asserted(&mut pin, config.active) {
                debug!("btn{} released before the window ended", self.source.0);
                continue;
            }

            debug!("btn{} confirmed", self.source.0);
            sink.confirm::<M>(self.source, send_timeout)
                .await
                .map_err(|err| console::fatal(serial, err))?;
        }
    }
}

fn is_asserted<P: InputPin>(pin: &mut P, active: ActiveLevel) -> bool {
    let level = match active {
        ActiveLevel::Low => pin.is_low(),
        ActiveLevel::High => pin.is_high(),
    };

    level.unwrap_or_else(|_| {
        warn!("input read failed, treating it as released");
        false
    })
}

/// Where a debounce task delivers confirmed presses.
pub trait ConfirmSink {
    /// Deliver one press of `source`, waiting at most `timeout` for room.
    async fn confirm<M: Monotonic>(
        &mut self,
        source: SourceId,
        timeout: M::Duration,
    ) -> Result<(), DebounceError>;
}

/// Pushes an [`InputEvent`] onto an event queue.
pub struct QueueSink<'q, const N: usize> {
    tx: QueueSender<'q, InputEvent, N>,
    payload: Payload,
}

impl<'q, const N: usize> QueueSink<'q, N> {
    /// Send events carrying a copy of `payload` through `tx`.
    pub fn new(tx: QueueSender<'q, InputEvent, N>, payload: Payload) -> Self {
        Self { tx, payload }
    }
}

impl<const N: usize> ConfirmSink for QueueSink<'_, N> {
    async fn confirm<M: Monotonic>(
        &mut self,
        source: SourceId,
        timeout: M::Duration,
    ) -> Result<(), DebounceError> {
        let event = InputEvent::pressed(source, self.payload.clone());

        self.tx
            .send_timeout::<M>(event, timeout)
            .await
            .map_err(|_| DebounceError::ChannelSaturated { source })
    }
}

/// Sets bits in an event group.
pub struct BitsSink<'g> {
    group: &'g EventGroup,
    bits: u32,
}

impl<'g> BitsSink<'g> {
    /// Set `bits` in `group` on every press.
    pub const fn new(group: &'g EventGroup, bits: u32) -> Self {
        Self { group, bits }
    }
}

impl ConfirmSink for BitsSink<'_> {
    async fn confirm<M: Monotonic>(
        &mut self,
        _source: SourceId,
        _timeout: M::Duration,
    ) -> Result<(), DebounceError> {
        self.group.set(self.bits);
        Ok(())
    }
}
