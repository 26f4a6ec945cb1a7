//! Multi-threaded producers and consumers on the host.
//!
//! To run this test, you need to activate the `critical-section/std` feature.

use std::collections::BTreeMap;

use rtlab_sync::queue::EventQueue;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queue_keeps_per_producer_order() {
    const PRODUCERS: usize = 8;
    const ITEMS: usize = 250;
    const QUEUE_SIZE: usize = 6;

    static QUEUE: EventQueue<(usize, usize), QUEUE_SIZE> = EventQueue::new();
    let (tx, mut rx) = QUEUE.split().unwrap();

    let mut handles = Vec::new();
    for producer in 0..PRODUCERS {
        let tx = tx.clone();
        handles.push(tokio::spawn(async move {
            for seq in 0..ITEMS {
                tx.send((producer, seq)).await;
            }
        }));
    }

    let mut next = BTreeMap::new();
    for _ in 0..PRODUCERS * ITEMS {
        let (producer, seq) = rx.recv().await;
        let expected = next.entry(producer).or_insert(0);
        assert_eq!(seq, *expected, "producer {producer} out of order");
        *expected += 1;
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert!(rx.is_empty());
    assert!(next.values().all(|&n| n == ITEMS));
}
