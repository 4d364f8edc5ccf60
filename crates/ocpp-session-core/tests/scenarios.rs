//! End-to-end scenarios against a real `Engine`, driven by manual clock
//! advances rather than wall-clock sleeps.

mod support;

use ocpp_session_core::{
    Engine, Event, Message, MessageType, Role, CONFIG_HEARTBEAT_INTERVAL, CONFIG_TX_ATTEMPTS, CONFIG_TX_RETRY_INTERVAL,
};
use support::{ClockHandle, EventLog, MockTransport, SequentialIds};

fn new_engine() -> (Engine<MockTransport, ClockHandle, SequentialIds>, MockTransport, ClockHandle, EventLog) {
    let transport = MockTransport::new();
    let clock = ClockHandle::new(1_000);
    let engine = Engine::new(transport.clone(), clock.clone(), SequentialIds::new());
    let log = EventLog::new();
    engine.init(log.sink()).expect("init never fails");
    (engine, transport, clock, log)
}

#[test]
fn heartbeat_fires_once_per_interval_while_idle() {
    let (engine, transport, clock, _log) = new_engine();
    engine.config().set_int(CONFIG_HEARTBEAT_INTERVAL, 30);

    engine.step().unwrap();
    assert!(transport.sent_messages().is_empty(), "no heartbeat due immediately after init");

    clock.advance(30);
    engine.step().unwrap();
    let sent = transport.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].msg_type, MessageType::Heartbeat);

    // The heartbeat is now in `wait`; ticking again before the interval
    // re-elapses must not synthesize a second one.
    engine.step().unwrap();
    assert_eq!(transport.sent_messages().len(), 1);
}

#[test]
fn boot_notification_retries_indefinitely_on_send_failure() {
    let (engine, transport, clock, log) = new_engine();
    transport.set_fail_sends(true);

    engine.push_request(MessageType::BootNotification, b"boot".to_vec(), false).unwrap();

    // Drive many wait-timeout/retry cycles; BootNotification must never be
    // dropped regardless of how many attempts have failed (spec §4.2/§4.3).
    for _ in 0..20 {
        engine.step().unwrap();
        clock.advance(ocpp_session_core::TX_TIMEOUT_SEC);
    }

    assert_eq!(engine.count_pending_requests(), 1, "boot notification must still be pending");
    let freed = log.events().into_iter().any(|e| matches!(e, Event::Free(m) if m.msg_type == MessageType::BootNotification));
    assert!(!freed, "boot notification must never be freed by retry exhaustion");
}

#[test]
fn droppable_message_is_dropped_once_its_attempt_budget_is_exhausted() {
    let (engine, transport, clock, log) = new_engine();
    transport.set_fail_sends(true);

    engine.push_request(MessageType::DataTransfer, b"payload".to_vec(), false).unwrap();

    // Attempt 1 fails, slot goes to wait with a TX_TIMEOUT_SEC deadline.
    engine.step().unwrap();
    assert_eq!(engine.count_pending_requests(), 1);

    // Not yet due: nothing changes.
    engine.step().unwrap();
    assert_eq!(engine.count_pending_requests(), 1);

    // Cross the deadline: phase 1 requeues it, phase 2 retries (attempt 2 of
    // a 2-attempt budget), which also fails and this time exhausts the budget.
    clock.advance(ocpp_session_core::TX_TIMEOUT_SEC);
    engine.step().unwrap();

    assert_eq!(engine.count_pending_requests(), 0, "exhausted droppable message must be freed");
    let freed = log.events().into_iter().any(|e| matches!(e, Event::Free(m) if m.msg_type == MessageType::DataTransfer));
    assert!(freed, "a Free event must be emitted when the budget is exhausted");
}

#[test]
fn overflow_eviction_frees_the_oldest_evictable_ready_slot() {
    let (engine, _transport, _clock, log) = new_engine();

    // Fill the pool with evictable messages that never get a chance to send
    // (they just sit in ready — step() is never called in this test).
    for _ in 0..ocpp_session_core::TX_POOL_LEN {
        engine.push_request(MessageType::DataTransfer, Vec::new(), false).unwrap();
    }

    assert!(engine.push_request(MessageType::DataTransfer, Vec::new(), false).is_err(), "pool should be full");

    engine.push_request(MessageType::DataTransfer, b"forced".to_vec(), true).unwrap();
    assert_eq!(engine.count_pending_requests(), ocpp_session_core::TX_POOL_LEN);

    let freed = log.events().into_iter().any(|e| matches!(e, Event::Free(_)));
    assert!(freed, "forced push over capacity must evict and emit a Free event");
}

#[test]
fn overflow_eviction_fails_when_nothing_is_evictable() {
    let (engine, _transport, _clock, _log) = new_engine();

    // Every eviction-exempt type, filling the whole pool.
    let exempt = [MessageType::BootNotification, MessageType::StartTransaction, MessageType::StopTransaction];
    for i in 0..ocpp_session_core::TX_POOL_LEN {
        engine.push_request(exempt[i % exempt.len()], Vec::new(), false).unwrap();
    }

    let result = engine.push_request(MessageType::DataTransfer, Vec::new(), true);
    assert!(result.is_err(), "forced push must fail when no slot in ready is evictable");
}

#[test]
fn transaction_related_callerror_backs_off_and_retries() {
    let (engine, transport, clock, log) = new_engine();
    engine.config().set_int(CONFIG_TX_ATTEMPTS, 3);
    engine.config().set_int(CONFIG_TX_RETRY_INTERVAL, 5);

    let id = engine.push_request(MessageType::StartTransaction, b"start".to_vec(), false).unwrap();
    engine.step().unwrap(); // sends successfully, moves to wait

    let sent = transport.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, id);

    transport.push_inbound(Message {
        id: id.clone(),
        role: Role::CallError,
        msg_type: MessageType::StartTransaction,
        payload: b"error".to_vec(),
    });

    engine.step().unwrap(); // correlates, retries (attempts 1 < budget 3)
    assert_eq!(engine.count_pending_requests(), 1, "transaction-related CALLERROR should be retried, not dropped");

    let incoming = log.events().into_iter().any(|e| matches!(e, Event::Incoming(m) if m.id == id));
    assert!(incoming, "the CALLERROR must still be delivered to the host");

    // Advance past the backoff window and resend.
    clock.advance(5);
    engine.step().unwrap();
    let sent = transport.sent_messages();
    assert_eq!(sent.len(), 2, "the retried StartTransaction must be resent after backoff");
}

#[test]
fn unmatched_response_is_logged_and_dropped_without_touching_pool() {
    let (engine, transport, _clock, log) = new_engine();

    engine.push_request(MessageType::Authorize, b"auth".to_vec(), false).unwrap();
    engine.step().unwrap();
    assert_eq!(transport.sent_messages().len(), 1);

    transport.push_inbound(Message {
        id: "no-such-id".to_string(),
        role: Role::CallResult,
        msg_type: MessageType::Authorize,
        payload: Vec::new(),
    });
    engine.step().unwrap();

    assert_eq!(engine.count_pending_requests(), 1, "unmatched response must not touch the pending request");
    let delivered = log.events().into_iter().any(|e| matches!(e, Event::Incoming(m) if m.id == "no-such-id"));
    assert!(!delivered, "an unmatched response must not be delivered as an Incoming event");
}

#[test]
fn prefix_match_correlates_a_truncated_response_id() {
    let (engine, transport, _clock, _log) = new_engine();

    let id = engine.push_request(MessageType::Authorize, b"auth".to_vec(), false).unwrap();
    engine.step().unwrap();
    assert_eq!(transport.sent_messages().len(), 1);

    let truncated: String = id.chars().take(2).collect();
    assert!(truncated.len() < id.len(), "the truncated id must be a proper prefix for this to test anything");
    transport.push_inbound(Message { id: truncated, role: Role::CallResult, msg_type: MessageType::Authorize, payload: Vec::new() });
    engine.step().unwrap();

    assert_eq!(engine.count_pending_requests(), 0, "a prefix-equal id must still correlate");
}
