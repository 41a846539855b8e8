use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::active::{ActiveBehavior, ActiveHandle, ActiveObject};
use crate::event::{ActiveEvent, Dispatch};
use crate::queue::QueueFull;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Start,
    Ping(u8),
    Echo,
    Bogus,
}

impl ActiveEvent for Probe {
    const START: Self = Probe::Start;
}

#[derive(Clone, Default)]
struct Collector {
    events: Arc<Mutex<Vec<Probe>>>,
}

struct Recorder {
    collector: Collector,
    own: Option<ActiveHandle<Probe, 4>>,
    done: Option<mpsc::Sender<Probe>>,
}

impl ActiveBehavior for Recorder {
    type Event = Probe;

    fn on_event(&mut self, event: Probe) -> Dispatch {
        match event {
            Probe::Start | Probe::Ping(_) => {
                self.collector.events.lock().unwrap().push(event);
                if let (Probe::Ping(0), Some(own)) = (event, &self.own) {
                    own.post(Probe::Echo).unwrap();
                }
            }
            Probe::Echo => self.collector.events.lock().unwrap().push(event),
            Probe::Bogus => return Dispatch::Unhandled,
        }
        if let Some(done) = &self.done {
            let _ = done.send(event);
        }
        Dispatch::Handled
    }
}

fn recorder(collector: &Collector) -> Recorder {
    Recorder {
        collector: collector.clone(),
        own: None,
        done: None,
    }
}

#[test]
fn start_event_is_dispatched_first() {
    let collector = Collector::default();
    let ao: ActiveObject<Probe, 4> = ActiveObject::new("probe");
    let handle = ao.handle();
    handle.post(Probe::Ping(1)).unwrap();

    let mut runner = ao.runner(recorder(&collector));
    runner.start();
    handle.post(Probe::Ping(2)).unwrap();
    assert_eq!(runner.run_until_idle(), 3);

    let events = collector.events.lock().unwrap();
    // The ping posted before start stays ahead of the start event.
    assert_eq!(
        events.as_slice(),
        &[Probe::Ping(1), Probe::Start, Probe::Ping(2)]
    );
}

#[test]
fn events_posted_while_handling_are_drained_in_same_pass() {
    let collector = Collector::default();
    let ao: ActiveObject<Probe, 4> = ActiveObject::new("probe");
    let handle = ao.handle();
    let mut behavior = recorder(&collector);
    behavior.own = Some(handle.clone());

    let mut runner = ao.runner(behavior);
    runner.start();
    handle.post(Probe::Ping(0)).unwrap();
    assert_eq!(runner.run_until_idle(), 3);
    assert!(!runner.dispatch_one());

    let events = collector.events.lock().unwrap();
    assert_eq!(
        events.as_slice(),
        &[Probe::Start, Probe::Ping(0), Probe::Echo]
    );
}

#[test]
fn full_queue_drop_is_reported_to_producer() {
    let ao: ActiveObject<Probe, 4> = ActiveObject::new("probe");
    let handle = ao.handle();
    for n in 0..4 {
        handle.post(Probe::Ping(n)).unwrap();
    }

    assert_eq!(handle.post(Probe::Ping(9)), Err(QueueFull { capacity: 4 }));
    assert_eq!(handle.dropped(), 1);
    assert_eq!(handle.pending(), 4);
}

#[test]
#[should_panic(expected = "received unknown event")]
fn unknown_event_is_fatal() {
    let collector = Collector::default();
    let ao: ActiveObject<Probe, 4> = ActiveObject::new("probe");
    let handle = ao.handle();
    let mut runner = ao.runner(recorder(&collector));
    handle.post(Probe::Bogus).unwrap();
    runner.run_until_idle();
}

#[test]
fn spawned_object_consumes_its_queue() {
    let collector = Collector::default();
    let (tx, rx) = mpsc::channel();
    let ao: ActiveObject<Probe, 4> = ActiveObject::new("probe-thread").with_stack_size(64 * 1024);
    let handle = ao.handle();
    let mut behavior = recorder(&collector);
    behavior.done = Some(tx);
    ao.spawn(behavior).unwrap();

    let timeout = Duration::from_secs(5);
    assert_eq!(rx.recv_timeout(timeout).unwrap(), Probe::Start);
    handle.post(Probe::Ping(5)).unwrap();
    handle.post(Probe::Ping(6)).unwrap();
    assert_eq!(rx.recv_timeout(timeout).unwrap(), Probe::Ping(5));
    assert_eq!(rx.recv_timeout(timeout).unwrap(), Probe::Ping(6));
}
