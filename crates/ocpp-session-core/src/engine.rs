//! The step engine and public API (spec §4.5, §4.7).
//!
//! `Engine` is the single object a host holds. Every public method locks
//! `Engine::state` for the minimum span needed to touch pool/list state and
//! releases it before calling into `Transport::send`/`Transport::recv` or
//! the event sink (spec §5) — the same discipline the teacher crate's
//! `InterpreterPool::dispatch_work` uses around its condvar wait and the
//! VM's blocking execution.

use std::sync::Mutex;

use crate::classify;
use crate::clock::Clock;
use crate::config::ConfigStore;
use crate::error::EngineError;
use crate::event::{Event, EventSink};
use crate::pool::{ListKind, Pool, Slot};
use crate::retry;
use crate::snapshot::{self, SnapshotBody};
use crate::transport::{IdGenerator, Transport};
use crate::types::{Message, MessageType, Role, CONFIG_HEARTBEAT_INTERVAL, CONFIG_TX_ATTEMPTS, CONFIG_TX_RETRY_INTERVAL};

struct EngineState {
    pool: Pool,
    tx_ts: u64,
    rx_ts: u64,
}

/// The message-lifecycle engine (spec §2 "Step engine" + "Public API").
///
/// Generic over the three host-provided collaborators so a host picks its
/// own `Transport`/`Clock`/`IdGenerator` at the type level, with zero
/// dynamic dispatch on the hot `step` path; the event sink alone is boxed,
/// since hosts construct it once from a closure (see `event.rs`).
pub struct Engine<T: Transport, C: Clock, I: IdGenerator> {
    state: Mutex<EngineState>,
    sink: Mutex<EventSink>,
    config: ConfigStore,
    transport: T,
    clock: C,
    id_gen: I,
}

impl<T: Transport, C: Clock, I: IdGenerator> Engine<T, C, I> {
    /// Build an engine. Call [`Engine::init`] before using it — construction
    /// alone does not seed timestamps or install an event sink (spec §4.7
    /// `init` is the operation that does that).
    pub fn new(transport: T, clock: C, id_gen: I) -> Self {
        Self {
            state: Mutex::new(EngineState { pool: Pool::new(), tx_ts: 0, rx_ts: 0 }),
            sink: Mutex::new(Box::new(|_event: Event| {})),
            config: ConfigStore::new(),
            transport,
            clock,
            id_gen,
        }
    }

    /// Zero state, seed timestamps from `now()`, reset configuration to
    /// defaults, install the event sink (spec §4.7 `init`).
    pub fn init(&self, event_sink: EventSink) -> Result<(), EngineError> {
        let now = self.clock.now();
        {
            let mut state = self.state.lock().expect("engine mutex poisoned");
            state.pool.clear();
            state.tx_ts = now;
            state.rx_ts = now;
        }
        *self.sink.lock().expect("sink mutex poisoned") = event_sink;
        self.config.reset_to_defaults();
        Ok(())
    }

    /// The configuration store (spec §2 component 2). Guarded by its own
    /// lock, independent of the engine lock (spec §5).
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// The host-provided transport, for hosts that need to feed it inbound
    /// traffic directly (e.g. a test double or a demo harness) rather than
    /// through a live socket.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn emit(&self, event: Event) {
        let mut sink = self.sink.lock().expect("sink mutex poisoned");
        (sink)(event);
    }

    // ── Public operations (spec §4.7) ───────────────────────────────────────

    /// Allocate and push a CALL to the ready tail. On allocation failure with
    /// `force`, evict the oldest evictable `ready` slot and retry once (spec
    /// §4.7, §4.8, §8 property 4).
    pub fn push_request(&self, msg_type: MessageType, payload: Vec<u8>, force: bool) -> Result<String, EngineError> {
        let id = self.id_gen.generate();
        let mut state = self.state.lock().expect("engine mutex poisoned");

        if state.pool.count_pending() >= crate::types::TX_POOL_LEN {
            if !force {
                return Err(EngineError::OutOfMemory);
            }
            let evicted_idx = state.pool.evict_oldest().ok_or(EngineError::OutOfMemory)?;
            let evicted_msg = state.pool.slot(evicted_idx).to_message();
            state.pool.free(evicted_idx);
            drop(state);
            tracing::warn!(id = %evicted_msg.id, msg_type = evicted_msg.msg_type.as_str(), "evicted to make room for a forced push");
            self.emit(Event::Free(evicted_msg));
            state = self.state.lock().expect("engine mutex poisoned");
        }

        let slot = Slot { id: id.clone(), role: Role::Call, msg_type, payload, expiry: 0, attempts: 0 };
        state.pool.alloc_into(slot, ListKind::Ready, false)?;
        tracing::trace!(id = %id, msg_type = msg_type.as_str(), "push_request queued");
        Ok(id)
    }

    /// Allocate a CALL; push to ready tail if `timer_sec == 0`, else to the
    /// timer list with `expiry = now + timer_sec` (spec §4.7).
    pub fn push_request_defer(&self, msg_type: MessageType, payload: Vec<u8>, timer_sec: u64) -> Result<String, EngineError> {
        let id = self.id_gen.generate();
        let now = self.clock.now();
        let (list, expiry) = if timer_sec == 0 { (ListKind::Ready, 0) } else { (ListKind::Timer, now + timer_sec) };
        let slot = Slot { id: id.clone(), role: Role::Call, msg_type, payload, expiry, attempts: 0 };

        let mut state = self.state.lock().expect("engine mutex poisoned");
        state.pool.alloc_into(slot, list, false)?;
        Ok(id)
    }

    /// Allocate a slot carrying the request's id with role CALLRESULT or
    /// CALLERROR, push to ready tail (spec §4.7).
    pub fn push_response(&self, request_id: &str, msg_type: MessageType, payload: Vec<u8>, is_error: bool) -> Result<(), EngineError> {
        let role = if is_error { Role::CallError } else { Role::CallResult };
        let slot = Slot { id: request_id.to_string(), role, msg_type, payload, expiry: 0, attempts: 0 };

        let mut state = self.state.lock().expect("engine mutex poisoned");
        state.pool.alloc_into(slot, ListKind::Ready, false)?;
        Ok(())
    }

    /// Sum of the three list lengths (spec §4.7).
    pub fn count_pending_requests(&self) -> usize {
        self.state.lock().expect("engine mutex poisoned").pool.count_pending()
    }

    /// Free every slot of `msg_type` across all three lists; return the count (spec §4.7).
    pub fn drop_pending_type(&self, msg_type: MessageType) -> usize {
        let dropped: Vec<Message> = {
            let mut state = self.state.lock().expect("engine mutex poisoned");
            let idxs = state.pool.drop_pending_type(msg_type);
            let msgs: Vec<Message> = idxs.iter().map(|&idx| state.pool.slot(idx).to_message()).collect();
            for idx in idxs {
                state.pool.free(idx);
            }
            msgs
        };
        let count = dropped.len();
        for msg in dropped {
            self.emit(Event::Free(msg));
        }
        count
    }

    /// Prefix-match lookup of a message type by (possibly partial) id (spec §4.7 `type_from_idstr`).
    pub fn type_from_idstr(&self, idstr: &str) -> Option<MessageType> {
        self.state.lock().expect("engine mutex poisoned").pool.type_in_wait_by_id(idstr)
    }

    /// Opaque, versioned snapshot of the entire engine state (spec §4.7, §6).
    pub fn save_snapshot(&self) -> Result<Vec<u8>, EngineError> {
        let state = self.state.lock().expect("engine mutex poisoned");
        let body = SnapshotBody {
            tx_ts: state.tx_ts,
            rx_ts: state.rx_ts,
            heartbeat_interval: self.config.get_int(CONFIG_HEARTBEAT_INTERVAL).unwrap_or(0),
            tx_retry_interval: self.config.get_int(CONFIG_TX_RETRY_INTERVAL).unwrap_or(0),
            tx_attempts: self.config.get_int(CONFIG_TX_ATTEMPTS).unwrap_or(1),
            pool: state.pool.export_snapshot(),
        };
        drop(state);
        Ok(snapshot::encode(&body)?)
    }

    /// Restore from a snapshot produced by [`Engine::save_snapshot`]; replaces `init` (spec §4.7).
    pub fn restore_snapshot(&self, buf: &[u8]) -> Result<(), EngineError> {
        let body = snapshot::decode(buf)?;
        {
            let mut state = self.state.lock().expect("engine mutex poisoned");
            state.pool.import_snapshot(body.pool)?;
            state.tx_ts = body.tx_ts;
            state.rx_ts = body.rx_ts;
        }
        self.config.set_int(CONFIG_HEARTBEAT_INTERVAL, body.heartbeat_interval);
        self.config.set_int(CONFIG_TX_RETRY_INTERVAL, body.tx_retry_interval);
        self.config.set_int(CONFIG_TX_ATTEMPTS, body.tx_attempts);
        Ok(())
    }

    /// The size, in bytes, that [`Engine::save_snapshot`] would currently produce (spec §4.7).
    pub fn compute_snapshot_size(&self) -> usize {
        self.save_snapshot().map(|buf| buf.len()).unwrap_or(0)
    }

    // ── The step engine (spec §4.5) ──────────────────────────────────────────

    /// Run one scheduling tick: wait timeouts, at-most-one transmit, one
    /// inbound poll, heartbeat synthesis, timer promotion — in that order
    /// (spec §4.5).
    pub fn step(&self) -> Result<(), EngineError> {
        let now = self.clock.now();
        self.process_wait_timeouts(now);
        self.transmit(now);
        self.receive(now);
        self.heartbeat_if_due(now);
        self.promote_timers(now);
        Ok(())
    }

    /// Phase 1: requeue or drop every `wait` slot whose retry deadline has passed.
    fn process_wait_timeouts(&self, now: u64) {
        let dropped: Vec<Message> = {
            let mut state = self.state.lock().expect("engine mutex poisoned");
            let due = state.pool.pop_due_wait(now);
            let mut dropped = Vec::new();
            for idx in due {
                let msg_type = state.pool.slot(idx).msg_type;
                let attempts = state.pool.slot(idx).attempts;
                let should_drop = classify::is_droppable(msg_type) && attempts >= retry::attempt_budget(msg_type, &self.config);
                if should_drop {
                    dropped.push(state.pool.slot(idx).to_message());
                    state.pool.free(idx);
                } else {
                    state.pool.push_ready_front(idx);
                }
            }
            dropped
        };
        for msg in dropped {
            tracing::warn!(id = %msg.id, msg_type = msg.msg_type.as_str(), "wait timeout: attempt budget exhausted");
            self.emit(Event::Free(msg));
        }
    }

    /// Phase 2: send at most one `ready` message, provided nothing is already in flight.
    fn transmit(&self, now: u64) {
        let idx = {
            let mut state = self.state.lock().expect("engine mutex poisoned");
            if state.pool.wait_len() > 0 {
                return;
            }
            match state.pool.pop_ready() {
                Some(idx) => idx,
                None => return,
            }
        };

        let msg = {
            let mut state = self.state.lock().expect("engine mutex poisoned");
            let slot = state.pool.slot_mut(idx);
            slot.attempts += 1;
            slot.expiry = retry::retry_deadline(now);
            slot.to_message()
        };

        let send_result = self.transport.send(&msg);

        enum Outcome {
            KeepInWait,
            Free(Message),
        }

        let outcome = {
            let mut state = self.state.lock().expect("engine mutex poisoned");
            match (send_result, msg.role) {
                (Ok(()), Role::Call) => {
                    state.pool.push_wait(idx);
                    Outcome::KeepInWait
                }
                (Ok(()), Role::CallResult) | (Ok(()), Role::CallError) => {
                    state.pool.free(idx);
                    Outcome::Free(msg.clone())
                }
                (Ok(()), Role::Alloc) => unreachable!("an ALLOC-role slot never reaches the ready list"),
                (Err(ref err), _) => {
                    let attempts = state.pool.slot(idx).attempts;
                    let budget = retry::attempt_budget(msg.msg_type, &self.config);
                    let retriable = attempts < budget
                        || classify::is_transaction_related(msg.msg_type)
                        || msg.msg_type == MessageType::BootNotification;
                    if retriable {
                        state.pool.push_wait(idx);
                        tracing::warn!(id = %msg.id, error = %err, "send failed, will retry");
                        Outcome::KeepInWait
                    } else {
                        state.pool.free(idx);
                        tracing::warn!(id = %msg.id, error = %err, "send failed, budget exhausted");
                        Outcome::Free(msg.clone())
                    }
                }
            }
        };

        if let Outcome::Free(freed) = outcome {
            self.emit(Event::Free(freed));
        }
    }

    /// Phase 3: poll the transport once and correlate/deliver what comes back.
    fn receive(&self, now: u64) {
        match self.transport.recv() {
            Ok(None) => {}
            Ok(Some(incoming)) => self.handle_incoming(now, incoming),
            Err(err) => {
                tracing::error!(error = %err, "receive failed");
                self.emit(Event::Error(err));
            }
        }
    }

    fn handle_incoming(&self, now: u64, incoming: Message) {
        match incoming.role {
            Role::Call => {
                {
                    let mut state = self.state.lock().expect("engine mutex poisoned");
                    state.rx_ts = now;
                }
                self.emit(Event::Incoming(incoming));
            }
            Role::CallResult | Role::CallError => {
                let matched = {
                    let mut state = self.state.lock().expect("engine mutex poisoned");
                    state.pool.find_in_wait_by_id(&incoming.id).map(|idx| {
                        state.pool.remove_from_wait(idx);
                        state.tx_ts = now;
                        state.rx_ts = now;
                        (idx, state.pool.slot(idx).msg_type, state.pool.slot(idx).attempts)
                    })
                };

                let (idx, msg_type, attempts) = match matched {
                    Some(m) => m,
                    None => {
                        tracing::error!(id = %incoming.id, "no wait-list entry correlates with this response");
                        return;
                    }
                };

                self.emit(Event::Incoming(incoming.clone()));

                let retry_tx_error = incoming.role == Role::CallError
                    && classify::is_transaction_related(msg_type)
                    && attempts < retry::attempt_budget(msg_type, &self.config);

                if retry_tx_error {
                    let expiry = retry::next_send_period(now, msg_type, attempts, &self.config);
                    let mut state = self.state.lock().expect("engine mutex poisoned");
                    state.pool.slot_mut(idx).expiry = expiry;
                    state.pool.push_wait(idx);
                } else {
                    let freed = {
                        let mut state = self.state.lock().expect("engine mutex poisoned");
                        let msg = state.pool.slot(idx).to_message();
                        state.pool.free(idx);
                        msg
                    };
                    self.emit(Event::Free(freed));
                }
            }
            Role::Alloc => {
                tracing::error!("inbound message carries an invalid role");
            }
        }
    }

    /// Phase 4: if due, synthesize a Heartbeat CALL and re-run the transmit phase once (spec §4.5).
    ///
    /// The due predicate checks only `tx_ts` (spec §4.5, §9 open question 1);
    /// `rx_ts` is tracked for observability/snapshot but never consulted here.
    fn heartbeat_if_due(&self, now: u64) {
        let interval = self.config.get_int(CONFIG_HEARTBEAT_INTERVAL).unwrap_or(0);
        if interval <= 0 {
            return;
        }
        let interval = interval as u64;

        let due = {
            let state = self.state.lock().expect("engine mutex poisoned");
            state.pool.ready_len() == 0 && state.pool.wait_len() == 0 && now.saturating_sub(state.tx_ts) >= interval
        };
        if !due {
            return;
        }

        let slot = Slot {
            id: self.id_gen.generate(),
            role: Role::Call,
            msg_type: MessageType::Heartbeat,
            payload: Vec::new(),
            expiry: 0,
            attempts: 0,
        };
        {
            let mut state = self.state.lock().expect("engine mutex poisoned");
            if state.pool.alloc_into(slot, ListKind::Ready, false).is_err() {
                tracing::warn!("heartbeat due but the pool is full; skipping this tick");
                return;
            }
        }
        tracing::trace!("heartbeat due");
        self.transmit(now);
    }

    /// Phase 5: move every `timer` slot whose `expiry <= now` to the ready tail (spec §4.5).
    fn promote_timers(&self, now: u64) {
        let mut state = self.state.lock().expect("engine mutex poisoned");
        let due = state.pool.pop_due_timer(now);
        for idx in due {
            state.pool.push_ready_back(idx);
        }
    }
}
