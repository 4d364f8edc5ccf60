//! Test doubles shared by the integration suites.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use ocpp_session_core::{Clock, IdGenerator, Message, Transport, TransportError};

/// A clock the test advances explicitly; `now()` never moves on its own.
pub struct ManualClock {
    seconds: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self { seconds: AtomicU64::new(start) }
    }

    pub fn advance(&self, delta: u64) {
        self.seconds.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.seconds.load(Ordering::SeqCst)
    }
}

/// Wraps a shared `ManualClock` so a test can keep a handle to advance time
/// after one clone has been moved into an `Engine` (which owns its `Clock` by value).
#[derive(Clone)]
pub struct ClockHandle(pub Arc<ManualClock>);

impl ClockHandle {
    pub fn new(start: u64) -> Self {
        ClockHandle(Arc::new(ManualClock::new(start)))
    }

    pub fn advance(&self, delta: u64) {
        self.0.advance(delta);
    }
}

impl Clock for ClockHandle {
    fn now(&self) -> u64 {
        self.0.now()
    }
}

/// Deterministic ids: `"id-0"`, `"id-1"`, ... in allocation order.
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self { next: AtomicU64::new(0) }
    }
}

impl IdGenerator for SequentialIds {
    fn generate(&self) -> String {
        format!("id-{}", self.next.fetch_add(1, Ordering::SeqCst))
    }
}

struct MockTransportInner {
    sent: Mutex<Vec<Message>>,
    inbound: Mutex<VecDeque<Message>>,
    fail_sends: Mutex<bool>,
}

/// A transport whose `send` can be told to fail, and whose `recv` drains a
/// queue the test feeds directly. Cloning shares the underlying state, so a
/// test can keep a handle after moving one clone into an `Engine`.
#[derive(Clone)]
pub struct MockTransport(Arc<MockTransportInner>);

impl MockTransport {
    pub fn new() -> Self {
        MockTransport(Arc::new(MockTransportInner {
            sent: Mutex::new(Vec::new()),
            inbound: Mutex::new(VecDeque::new()),
            fail_sends: Mutex::new(false),
        }))
    }

    pub fn set_fail_sends(&self, fail: bool) {
        *self.0.fail_sends.lock().unwrap() = fail;
    }

    pub fn push_inbound(&self, msg: Message) {
        self.0.inbound.lock().unwrap().push_back(msg);
    }

    pub fn sent_messages(&self) -> Vec<Message> {
        self.0.sent.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn send(&self, msg: &Message) -> Result<(), TransportError> {
        if *self.0.fail_sends.lock().unwrap() {
            return Err(TransportError("mock send failure".to_string()));
        }
        self.0.sent.lock().unwrap().push(msg.clone());
        Ok(())
    }

    fn recv(&self) -> Result<Option<Message>, TransportError> {
        Ok(self.0.inbound.lock().unwrap().pop_front())
    }
}

struct EventLogInner {
    events: Mutex<Vec<ocpp_session_core::Event>>,
}

/// An event sink that records every event it receives, for assertions.
#[derive(Clone)]
pub struct EventLog(Arc<EventLogInner>);

impl EventLog {
    pub fn new() -> Self {
        EventLog(Arc::new(EventLogInner { events: Mutex::new(Vec::new()) }))
    }

    /// A boxed closure suitable for `Engine::init`, sharing this log's storage.
    pub fn sink(&self) -> ocpp_session_core::EventSink {
        let log = self.clone();
        Box::new(move |event| log.0.events.lock().unwrap().push(event))
    }

    pub fn events(&self) -> Vec<ocpp_session_core::Event> {
        self.0.events.lock().unwrap().clone()
    }
}
