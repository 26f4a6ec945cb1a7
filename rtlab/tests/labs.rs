//! The lab wirings, end to end.

mod common;

use core::pin::pin;

use cassette::Cassette;
use common::{Button, Console, Dma, Led};
use rtlab::action::LedBank;
use rtlab::config::{DebounceConfig, TransmitConfig};
use rtlab::debounce::ConfirmSink;
use rtlab::error::InitError;
use rtlab::event::{Payload, SourceId};
use rtlab::labs::queue_lab::{BANNER, BUTTONS, WELCOME};
use rtlab::labs::sync_lab::{self, CHEER, GREETING, REMINDER, RGB_LINE};
use rtlab::labs::{QueueLab, SyncLab};
use rtlab::transmit::TransferEvent;
use rtlab_time::Monotonic;

rtlab_time::tick_monotonic!(Mono, 1_000);

// One clock shared by all tests in this binary, so keep them in one function.
#[test]
fn labs() {
    Mono::start();

    queue_lab_reports_a_press();
    queue_lab_init_twice_fails();
    queue_lab_presses_carry_the_button_message();
    sync_lab_leds_meet_before_reporting();
    sync_lab_office();
}

fn queue_lab_reports_a_press() {
    let dma = Dma::default();
    let lab: QueueLab<Dma> = QueueLab::new(dma.clone(), TransmitConfig::new());
    let console = Console::default();

    let parts = lab.init(&console).unwrap();
    let [_red, green, _yellow] = parts.sinks;
    let mut worker = lab.worker(parts.events, <[Led; 3]>::default(), &console);
    assert_eq!(console.output(), [BANNER, WELCOME].concat());

    let button = Button::default();
    let timer = lab.debounce(SourceId(2)).unwrap();
    let debounce = pin!(timer.run::<Mono, _, _, _>(
        button.clone(),
        DebounceConfig::new(),
        green,
        &console
    ));
    let mut debounce = Cassette::new(debounce);
    assert!(debounce.poll_on().is_none());

    // Released lines are ignored by the edge interrupt.
    assert!(!lab.on_button_edge(SourceId(2), &mut button.clone()));
    button.press();
    assert!(lab.on_button_edge(SourceId(2), &mut button.clone()));
    assert!(!lab.on_button_edge(SourceId(9), &mut button.clone()));
    assert!(debounce.poll_on().is_none());

    Mono::advance(51);
    assert!(debounce.poll_on().is_none());

    {
        let step = pin!(worker.step());
        let mut step = Cassette::new(step);
        assert!(step.poll_on().is_none());
        assert_eq!(
            dma.sent(),
            ["button 2 was pressed-debounce 50ms and GREEN is changed \r\n"]
        );

        assert!(lab.on_dma_event(TransferEvent::Complete));
        assert_eq!(step.poll_on(), Some(Ok(58)));
    }

    assert_eq!(worker.leds().is_on(1), Some(true));
    assert_eq!(worker.leds().is_on(0), Some(false));
    assert!(!lab.transmitter().is_busy());
}

fn queue_lab_init_twice_fails() {
    let lab: QueueLab<Dma> = QueueLab::new(Dma::default(), TransmitConfig::new());
    let console = Console::default();

    let _parts = lab.init(&console).unwrap();
    assert_eq!(
        lab.init(&console).err(),
        Some(InitError::QueueAlreadySplit)
    );
    assert_eq!(
        console.output(),
        [BANNER, BANNER, "cannot create tenQueue \r\n"].concat()
    );
}

fn queue_lab_presses_carry_the_button_message() {
    let lab: QueueLab<Dma> = QueueLab::new(Dma::default(), TransmitConfig::new());
    let console = Console::default();
    let mut parts = lab.init(&console).unwrap();

    for (sink, button) in parts.sinks.iter_mut().zip(BUTTONS) {
        let confirm = pin!(sink.confirm::<Mono>(button.id, Mono::millis(20)));
        let mut confirm = Cassette::new(confirm);
        assert_eq!(confirm.poll_on(), Some(Ok(())));
    }

    let messages: Vec<_> = core::iter::from_fn(|| parts.events.try_recv())
        .map(|event| (event.source, event.payload))
        .collect();
    assert_eq!(
        messages,
        [
            (SourceId(1), Payload::Tagged { label: "RED", msg: "ohmygod" }),
            (SourceId(2), Payload::Tagged { label: "GREEN", msg: "olala" }),
            (SourceId(3), Payload::Tagged { label: "YELLOW", msg: "shhhh" }),
        ]
    );
    assert_eq!(messages[0].1.message(), Some("ohmygod"));
}

fn sync_lab_leds_meet_before_reporting() {
    let dma = Dma::default();
    let lab: SyncLab<Dma> = SyncLab::new(dma.clone(), TransmitConfig::new());
    let sinks = lab.init();
    assert_eq!(sinks.len(), 4);

    let mut workers = [0, 1, 2].map(|led| lab.led_worker(led, [Led::default()]).unwrap());
    assert!(lab.led_worker(3, [Led::default()]).is_none());

    let group = lab.group();
    group.set(sync_lab::SWITCH_BITS[0] | sync_lab::SWITCH_BITS[1] | sync_lab::SWITCH_BITS[2]);

    {
        let [w1, w2, w3] = &mut workers;
        let led1 = pin!(w1.step());
        let mut led1 = Cassette::new(led1);
        let led2 = pin!(w2.step());
        let mut led2 = Cassette::new(led2);
        let led3 = pin!(w3.step());
        let mut led3 = Cassette::new(led3);

        assert!(led1.poll_on().is_none());
        assert!(led2.poll_on().is_none());
        assert!(dma.sent().is_empty());
        assert_eq!(
            group.get() & sync_lab::LED_BARRIER,
            sync_lab::BIT_LED1_SYNC | sync_lab::BIT_LED2_SYNC
        );

        // The last one in releases the others and reports first.
        assert!(led3.poll_on().is_none());
        assert_eq!(group.get() & sync_lab::LED_BARRIER, 0);
        assert_eq!(
            dma.sent(),
            ["button 3 was pressed-debounce 50ms and LED3 is changed \r\n"]
        );

        assert!(led1.poll_on().is_none());
        assert!(led2.poll_on().is_none());
        lab.on_dma_event(TransferEvent::Complete);
        assert!(led3.poll_on().is_some());

        assert!(led1.poll_on().is_none());
        lab.on_dma_event(TransferEvent::Complete);
        assert!(led1.poll_on().is_some());

        assert!(led2.poll_on().is_none());
        lab.on_dma_event(TransferEvent::Complete);
        assert!(led2.poll_on().is_some());
    }

    assert_eq!(dma.sent().len(), 3);
    assert_eq!(group.get() & sync_lab::OFFICE_BITS, sync_lab::OFFICE_BITS);
    for worker in &mut workers {
        assert_eq!(worker.leds().is_on(0), Some(true));
    }
}

fn sync_lab_office() {
    let dma = Dma::default();
    let lab: SyncLab<Dma> = SyncLab::new(dma.clone(), TransmitConfig::new());
    let _sinks = lab.init();
    let mut started = false;

    for (bits, line) in [
        (0, GREETING),
        (0, REMINDER),
        (sync_lab::SWITCH_BITS[1], CHEER),
        (0, REMINDER),
    ] {
        lab.group().set(bits);
        let round = pin!(lab.office_round(&mut started));
        let mut round = Cassette::new(round);
        assert!(round.poll_on().is_none());
        lab.on_dma_event(TransferEvent::Complete);
        assert_eq!(round.poll_on(), Some(Ok(line.len())));
    }

    assert!(started);
    assert_eq!(dma.sent(), [GREETING, REMINDER, CHEER, REMINDER]);
    assert_eq!(lab.group().get(), sync_lab::BIT_SW2_STATE);

    let mut rgb = [Led::default()];
    lab.group().set(sync_lab::BIT_SW4_STATE);
    for _ in 0..2 {
        let round = pin!(lab.rgb_round(&mut rgb));
        let mut round = Cassette::new(round);
        assert!(round.poll_on().is_none());
        lab.on_dma_event(TransferEvent::Complete);
        assert_eq!(round.poll_on(), Some(Ok(RGB_LINE.len())));
    }
    assert_eq!(rgb.is_on(0), Some(true));
    assert_eq!(lab.group().get() & sync_lab::BIT_SW4_STATE, 0);
}
