//! Tasks and a DMA "interrupt" on different threads.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::Dma;
use rtlab::config::TransmitConfig;
use rtlab::transmit::{TransferEvent, Transmitter};

const MESSAGES: usize = 20;

async fn producer(tx: &Transmitter<Dma, 32>, id: usize) {
    for n in 0..MESSAGES {
        let sent = tx
            .transmit(|buf| {
                use core::fmt::Write;
                write!(buf, "{id}:{n}")
            })
            .await;
        assert!(sent.is_ok(), "{id}:{n} failed with {sent:?}");
        tokio::task::yield_now().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn interleaved_producers() {
    let dma = Dma::default();
    let tx = Arc::new(Transmitter::<Dma, 32>::new(dma.clone(), TransmitConfig::new()));
    let done = Arc::new(AtomicBool::new(false));

    let isr = {
        let tx = tx.clone();
        let dma = dma.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut completed = 0;
            while !done.load(Ordering::Relaxed) {
                if dma.sent().len() > completed {
                    completed += 1;
                    tx.on_transfer_event(TransferEvent::Complete);
                }
                thread::sleep(Duration::from_micros(20));
            }
        })
    };

    tokio::join!(producer(&tx, 0), producer(&tx, 1), producer(&tx, 2));

    done.store(true, Ordering::Relaxed);
    isr.join().unwrap();

    let sent = dma.sent();
    assert_eq!(sent.len(), 3 * MESSAGES);
    for id in 0..3 {
        let own: Vec<_> = sent
            .iter()
            .filter(|line| line.starts_with(&format!("{id}:")))
            .cloned()
            .collect();
        let expected: Vec<_> = (0..MESSAGES).map(|n| format!("{id}:{n}")).collect();
        assert_eq!(own, expected);
    }

    let status = tx.status();
    assert_eq!(status.issued, 3 * MESSAGES as u32);
    assert_eq!(status.completed, 3 * MESSAGES as u32);
    assert_eq!(status.stale, 0);
    assert!(!tx.is_busy());
}
