//! Timer queue behaviour on a hand-cranked tick clock.
//!
//! To run this test, you need to activate the `critical-section/std` feature.

use core::future::pending;
use core::pin::pin;

use cassette::Cassette;
use rtlab_time::{Monotonic, TimeoutError};

#[test]
fn delay_waits_at_least_the_duration() {
    rtlab_time::tick_monotonic!(Mono, 1_000);
    Mono::start();

    let start = Mono::now();
    let delay = pin!(Mono::delay(Mono::millis(3)));
    let mut delay = Cassette::new(delay);

    assert!(delay.poll_on().is_none());
    assert_eq!(Mono::sleepers(), 1);

    // One extra tick for the uncertainty of the first period.
    for _ in 0..3 {
        Mono::tick();
        assert!(delay.poll_on().is_none());
    }

    Mono::tick();
    assert!(delay.poll_on().is_some());
    assert_eq!((Mono::now() - start).ticks(), 4);
    assert_eq!(Mono::sleepers(), 0);
}

#[test]
fn zero_delay_is_ready_immediately() {
    rtlab_time::tick_monotonic!(Mono);
    Mono::start();

    let delay = pin!(Mono::delay(Mono::millis(0)));
    let mut delay = Cassette::new(delay);
    assert!(delay.poll_on().is_some());
}

#[test]
fn sleepers_wake_in_deadline_order() {
    rtlab_time::tick_monotonic!(Mono, 1_000);
    Mono::start();

    let now = Mono::now();
    let late = pin!(Mono::delay_until(now + Mono::millis(10)));
    let mut late = Cassette::new(late);
    let early = pin!(Mono::delay_until(now + Mono::millis(4)));
    let mut early = Cassette::new(early);

    assert!(late.poll_on().is_none());
    assert!(early.poll_on().is_none());
    assert_eq!(Mono::sleepers(), 2);

    Mono::advance(4);
    assert!(early.poll_on().is_some());
    assert!(late.poll_on().is_none());
    assert_eq!(Mono::sleepers(), 1);

    Mono::advance(6);
    assert!(late.poll_on().is_some());
}

#[test]
fn dropped_delay_leaves_the_queue() {
    rtlab_time::tick_monotonic!(Mono, 1_000);
    Mono::start();

    {
        let delay = pin!(Mono::delay(Mono::millis(100)));
        let mut delay = Cassette::new(delay);
        assert!(delay.poll_on().is_none());
        assert_eq!(Mono::sleepers(), 1);
    }

    assert_eq!(Mono::sleepers(), 0);
    Mono::advance(200);
}

#[test]
fn timeout_after_reports_expiry() {
    rtlab_time::tick_monotonic!(Mono, 1_000);
    Mono::start();

    let ready = pin!(Mono::timeout_after(Mono::millis(5), async { 7 }));
    let mut ready = Cassette::new(ready);
    assert_eq!(ready.poll_on(), Some(Ok(7)));

    let stuck = pin!(Mono::timeout_after(
        Mono::millis(5),
        pending::<()>()
    ));
    let mut stuck = Cassette::new(stuck);
    assert!(stuck.poll_on().is_none());

    Mono::advance(5);
    assert!(stuck.poll_on().is_none());

    Mono::tick();
    assert_eq!(stuck.poll_on(), Some(Err(TimeoutError)));
    assert_eq!(Mono::sleepers(), 0);
}

#[test]
#[should_panic]
fn delay_before_start_panics() {
    rtlab_time::tick_monotonic!(Mono, 1_000);

    let delay = pin!(Mono::delay(Mono::millis(1)));
    let mut delay = Cassette::new(delay);
    delay.poll_on();
}
