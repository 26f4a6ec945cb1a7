//! Four switches, one event group and a three way rendezvous.
//!
//! The debounce tasks of SW1..SW3 set a switch bit plus an "office" bit. Each LED worker waits
//! for its switch, lights its LED and then waits at the barrier until all three LED workers got
//! there; only then do they report. The office task greets, nags while nothing happens and
//! cheers once a switch was used.

use core::convert::Infallible;

use rtlab_sync::event_group::EventGroup;
use rtlab_time::Monotonic;

use crate::action::{Action, ActionTable, LedBank};
use crate::config::{TransmitConfig, DEBOUNCE_PERIOD_MS};
use crate::debounce::{BitsSink, DebounceTimer};
use crate::error::TransmitError;
use crate::event::{Payload, SourceId};
use crate::transmit::{DmaChannel, TransferEvent, Transmitter};
use crate::worker::{Barrier, BitsSubscription, PressReport, Worker};

/// SW1 was pressed.
pub const BIT_SW1_STATE: u32 = 1 << 1;
/// LED1 reached the barrier.
pub const BIT_LED1_SYNC: u32 = 1 << 2;
/// SW2 was pressed.
pub const BIT_SW2_STATE: u32 = 1 << 3;
/// LED2 reached the barrier.
pub const BIT_LED2_SYNC: u32 = 1 << 4;
/// SW3 was pressed.
pub const BIT_SW3_STATE: u32 = 1 << 5;
/// LED3 reached the barrier.
pub const BIT_LED3_SYNC: u32 = 1 << 6;
/// SW4 was pressed.
pub const BIT_SW4_STATE: u32 = 1 << 7;
/// SW1 activity, for the office task.
pub const BIT_1ST: u32 = 1 << 8;
/// SW2 activity, for the office task.
pub const BIT_2ND: u32 = 1 << 9;
/// SW3 activity, for the office task.
pub const BIT_3RD: u32 = 1 << 10;

/// Every LED participant of the barrier.
pub const LED_BARRIER: u32 = BIT_LED1_SYNC | BIT_LED2_SYNC | BIT_LED3_SYNC;

/// Switch activity the office task looks at.
pub const OFFICE_BITS: u32 = BIT_1ST | BIT_2ND | BIT_3RD;

/// Bits each switch sets once debounced.
pub const SWITCH_BITS: [u32; 4] = [
    BIT_SW1_STATE | BIT_1ST,
    BIT_SW2_STATE | BIT_2ND,
    BIT_SW3_STATE | BIT_3RD,
    BIT_SW4_STATE,
];

const LED_SWITCH: [u32; 3] = [BIT_SW1_STATE, BIT_SW2_STATE, BIT_SW3_STATE];
const LED_SYNC: [u32; 3] = [BIT_LED1_SYNC, BIT_LED2_SYNC, BIT_LED3_SYNC];
const LED_LABEL: [&str; 3] = ["LED1", "LED2", "LED3"];

/// First line of the office task.
pub const GREETING: &str = "Lab16-Event Group Synchronization \r\n";
/// Office line while no switch was used.
pub const REMINDER: &str = "please press the switches ... \r\n";
/// Office line after switch activity.
pub const CHEER: &str = "Awesome!!!\r\n";
/// Line of the RGB task.
pub const RGB_LINE: &str = "LEDRGB and SW4 \r\n";
/// Period of the office and RGB tasks.
pub const REPORT_PERIOD_MS: u32 = 5000;

/// Everything the lab shares between interrupts and tasks.
pub struct SyncLab<D, const N: usize = 128> {
    group: EventGroup,
    debounce: [DebounceTimer; 4],
    transmitter: Transmitter<D, N>,
}

impl<D: DmaChannel, const N: usize> SyncLab<D, N> {
    /// The lab around `dma`, ready to be put in a `static`.
    pub const fn new(dma: D, config: TransmitConfig) -> Self {
        Self {
            group: EventGroup::new(),
            debounce: [
                DebounceTimer::new(SourceId(1)),
                DebounceTimer::new(SourceId(2)),
                DebounceTimer::new(SourceId(3)),
                DebounceTimer::new(SourceId(4)),
            ],
            transmitter: Transmitter::new(dma, config),
        }
    }

    /// Clear every bit and hand out the debounce sinks of SW1..SW4.
    pub fn init(&self) -> [BitsSink<'_>; 4] {
        self.group.clear(u32::MAX);

        [
            BitsSink::new(&self.group, SWITCH_BITS[0]),
            BitsSink::new(&self.group, SWITCH_BITS[1]),
            BitsSink::new(&self.group, SWITCH_BITS[2]),
            BitsSink::new(&self.group, SWITCH_BITS[3]),
        ]
    }

    /// The event group.
    pub fn group(&self) -> &EventGroup {
        &self.group
    }

    /// The debounce timer of switch `id`.
    pub fn debounce(&self, id: SourceId) -> Option<&DebounceTimer> {
        self.debounce.get(id.index()?)
    }

    /// Edge interrupt of switch `id`; every edge restarts the window.
    pub fn on_switch_edge(&self, id: SourceId) -> bool {
        self.debounce(id).is_some_and(DebounceTimer::arm)
    }

    /// DMA interrupt of the console channel.
    pub fn on_dma_event(&self, event: TransferEvent) -> bool {
        self.transmitter.on_transfer_event(event)
    }

    /// The shared transmitter.
    pub fn transmitter(&self) -> &Transmitter<D, N> {
        &self.transmitter
    }

    /// Worker of LED `led` (0..3): waits for its switch, toggles LED 0 of `leds` and meets the
    /// other two LED workers before reporting.
    pub fn led_worker<L: LedBank>(
        &self,
        led: usize,
        leds: L,
    ) -> Option<Worker<'_, BitsSubscription<'_>, L, D, PressReport, 3, N>> {
        let switch = *LED_SWITCH.get(led)?;

        let events = BitsSubscription::new(
            &self.group,
            switch,
            SourceId(led as u8 + 1),
            Payload::Label(LED_LABEL[led]),
        );

        let mut actions = [Action::None; 3];
        actions[led] = Action::Toggle(0);

        Some(
            Worker::new(
                events,
                leds,
                ActionTable::new(actions),
                PressReport {
                    debounce_ms: DEBOUNCE_PERIOD_MS,
                },
                &self.transmitter,
            )
            .with_barrier(Barrier {
                group: &self.group,
                own: LED_SYNC[led],
                all: LED_BARRIER,
            }),
        )
    }

    /// One round of the office task: greet once, then cheer if a switch was used since the last
    /// round or remind otherwise. Consumes the switch activity bits.
    pub async fn office_round(&self, started: &mut bool) -> Result<usize, TransmitError> {
        let line = if self.group.get() & OFFICE_BITS != 0 {
            self.group.clear(OFFICE_BITS);
            CHEER
        } else if !*started {
            *started = true;
            GREETING
        } else {
            REMINDER
        };

        self.transmitter.transmit_str(line).await
    }

    /// The office task, one round every `period_ms`.
    pub async fn office<M: Monotonic>(&self, period_ms: u32) -> Infallible {
        let mut started = false;

        loop {
            if let Err(_err) = self.office_round(&mut started).await {
                warn!("office line lost: {}", _err);
            }
            M::delay(M::millis(period_ms)).await;
        }
    }

    /// One round of the RGB task: toggle LED 0 of `leds` if SW4 was pressed, then report.
    pub async fn rgb_round<L: LedBank>(&self, leds: &mut L) -> Result<usize, TransmitError> {
        if self.group.clear(BIT_SW4_STATE) & BIT_SW4_STATE != 0 {
            leds.toggle(0);
        }

        self.transmitter.transmit_str(RGB_LINE).await
    }

    /// The RGB task, one round every `period_ms`.
    pub async fn rgb<M: Monotonic, L: LedBank>(&self, mut leds: L, period_ms: u32) -> Infallible {
        loop {
            if let Err(_err) = self.rgb_round(&mut leds).await {
                warn!("rgb line lost: {}", _err);
            }
            M::delay(M::millis(period_ms)).await;
        }
    }
}
