use std::sync::mpsc;
use std::time::Duration;

use crate::queue::QueueFull;
use crate::work::WorkQueue;

#[test]
fn queued_work_runs_in_order() {
    let queue: WorkQueue<4> = WorkQueue::new();
    let (tx, rx) = mpsc::channel();
    for n in 0..3 {
        let tx = tx.clone();
        queue.push_work(move || tx.send(n).unwrap()).unwrap();
    }
    assert_eq!(queue.pending(), 3);

    assert_eq!(queue.run_pending(), 3);
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(queue.run_pending(), 0);
}

#[test]
fn full_queue_drops_new_work() {
    let queue: WorkQueue<2> = WorkQueue::new();
    queue.push_work(|| {}).unwrap();
    queue.push_work(|| {}).unwrap();

    assert_eq!(queue.push_work(|| {}), Err(QueueFull { capacity: 2 }));
    assert_eq!(queue.dropped(), 1);
    assert_eq!(queue.run_pending(), 2);
}

#[test]
fn worker_thread_runs_work_pushed_from_other_handles() {
    let queue: WorkQueue<8> = WorkQueue::new();
    let worker = queue.spawn("test-worker").unwrap();
    let producer = queue.clone();
    let (tx, rx) = mpsc::channel();

    for n in 0..5 {
        let tx = tx.clone();
        producer
            .push_work(move || {
                let name = std::thread::current().name().map(str::to_owned);
                tx.send((n, name)).unwrap();
            })
            .unwrap();
    }

    let timeout = Duration::from_secs(5);
    for n in 0..5 {
        let (got, name) = rx.recv_timeout(timeout).unwrap();
        assert_eq!(got, n);
        assert_eq!(name.as_deref(), Some("test-worker"));
    }

    queue.shutdown();
    worker.join().unwrap();
}
