//! Three buttons, three LEDs, one queue and one worker.
//!
//! Each button interrupt arms its debounce timer if the button reads pressed. A confirmed press
//! is queued with the colour of its LED, the worker toggles that LED and reports it over DMA.

use embedded_hal::digital::InputPin;
use rtlab_sync::queue::{EventQueue, QueueReceiver};

use crate::action::{Action, ActionTable, LedBank};
use crate::config::{ActiveLevel, TransmitConfig, DEBOUNCE_PERIOD_MS, QUEUE_LENGTH, TX_BUFFER_SIZE};
use crate::console::{self, EmergencySerial};
use crate::debounce::{DebounceTimer, QueueSink};
use crate::error::InitError;
use crate::event::{InputEvent, Payload, SourceId};
use crate::transmit::{DmaChannel, TransferEvent, Transmitter};
use crate::worker::{PressReport, Worker};

/// Printed on the console by [`QueueLab::init`].
pub const BANNER: &str = "lab10 - queue and 3 ISR \r\n";

/// Printed on the console when the worker starts.
pub const WELCOME: &str = "lk is on the  road-please press a button... \r\n";

/// A button of the lab board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button {
    /// Number of the button, from 1.
    pub id: SourceId,
    /// Colour of the LED it toggles.
    pub color: &'static str,
    /// Message travelling with every press of the button.
    pub msg: &'static str,
}

/// The buttons, in LED order.
pub const BUTTONS: [Button; 3] = [
    Button {
        id: SourceId(1),
        color: "RED",
        msg: "ohmygod",
    },
    Button {
        id: SourceId(2),
        color: "GREEN",
        msg: "olala",
    },
    Button {
        id: SourceId(3),
        color: "YELLOW",
        msg: "shhhh",
    },
];

/// The event channel type of this lab.
pub type ButtonQueue = EventQueue<InputEvent, QUEUE_LENGTH>;

/// Everything the lab shares between interrupts and tasks.
pub struct QueueLab<D, const N: usize = TX_BUFFER_SIZE> {
    queue: ButtonQueue,
    debounce: [DebounceTimer; 3],
    transmitter: Transmitter<D, N>,
}

/// The halves handed out by [`QueueLab::init`].
pub struct QueueLabParts<'a> {
    /// One sink per button, for the debounce tasks.
    pub sinks: [QueueSink<'a, QUEUE_LENGTH>; 3],
    /// The worker's end of the queue.
    pub events: QueueReceiver<'a, InputEvent, QUEUE_LENGTH>,
}

impl<D: DmaChannel, const N: usize> QueueLab<D, N> {
    /// The lab around `dma`, ready to be put in a `static`.
    pub const fn new(dma: D, config: TransmitConfig) -> Self {
        Self {
            queue: EventQueue::new(),
            debounce: [
                DebounceTimer::new(BUTTONS[0].id),
                DebounceTimer::new(BUTTONS[1].id),
                DebounceTimer::new(BUTTONS[2].id),
            ],
            transmitter: Transmitter::new(dma, config),
        }
    }

    /// Print the banner and split the queue. Fails when called twice.
    pub fn init<C: EmergencySerial + ?Sized>(
        &self,
        serial: &C,
    ) -> Result<QueueLabParts<'_>, InitError> {
        console::debug_msg(serial, BANNER);

        let (tx, events) = self
            .queue
            .split()
            .map_err(|err| console::fatal(serial, InitError::from(err)))?;

        let sink = |button: &Button| {
            let payload = Payload::Tagged {
                label: button.color,
                msg: button.msg,
            };
            QueueSink::new(tx.clone(), payload)
        };
        let sinks = [sink(&BUTTONS[0]), sink(&BUTTONS[1]), sink(&BUTTONS[2])];

        info!("queue lab ready");
        Ok(QueueLabParts { sinks, events })
    }

    /// The debounce timer of button `id`.
    pub fn debounce(&self, id: SourceId) -> Option<&DebounceTimer> {
        self.debounce.get(id.index()?)
    }

    /// Edge interrupt of button `id`: arm its timer if the button reads pressed.
    pub fn on_button_edge<P: InputPin>(&self, id: SourceId, pin: &mut P) -> bool {
        self.debounce(id)
            .is_some_and(|timer| timer.arm_if_asserted(pin, ActiveLevel::Low))
    }

    /// DMA interrupt of the console channel.
    pub fn on_dma_event(&self, event: TransferEvent) -> bool {
        self.transmitter.on_transfer_event(event)
    }

    /// The shared transmitter.
    pub fn transmitter(&self) -> &Transmitter<D, N> {
        &self.transmitter
    }

    /// Button `n` toggles LED `n`.
    pub const fn actions() -> ActionTable<3> {
        ActionTable::new([Action::Toggle(0), Action::Toggle(1), Action::Toggle(2)])
    }

    /// The lab's worker, printing the welcome line first.
    pub fn worker<'a, L: LedBank, C: EmergencySerial + ?Sized>(
        &'a self,
        events: QueueReceiver<'a, InputEvent, QUEUE_LENGTH>,
        leds: L,
        serial: &C,
    ) -> Worker<'a, QueueReceiver<'a, InputEvent, QUEUE_LENGTH>, L, D, PressReport, 3, N> {
        console::debug_msg(serial, WELCOME);

        Worker::new(
            events,
            leds,
            Self::actions(),
            PressReport {
                debounce_ms: DEBOUNCE_PERIOD_MS,
            },
            &self.transmitter,
        )
    }
}
