//! Message pool and three-list queue discipline (spec §3, §4.1, §4.4, §4.6, §4.8).
//!
//! The source engine this is modeled on threads `ready`/`wait`/`timer` as
//! intrusive linked lists through a fixed slab, moving slots between lists
//! without touching an allocator. Safe Rust gets the same O(1)-move,
//! no-extra-allocation property by keeping slot *indices* (`usize`) in three
//! `VecDeque`s over a `Vec<Option<Slot>>` — the invariant "a slot is in at
//! most one list" is enforced by construction: an index is always moved
//! (popped from one deque, pushed to another), never copied between them.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::classify::is_evictable;
use crate::error::EngineError;
use crate::types::{MessageType, Role, TX_POOL_LEN};

/// A pool slot: the full internal record for a message in flight (spec §3).
///
/// `expiry`'s meaning depends on which list holds the slot: in `wait` it is
/// the retry deadline; in `timer` it is the release-into-ready time. A slot
/// in `ready` does not consult `expiry` at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: String,
    pub role: Role,
    pub msg_type: MessageType,
    pub payload: Vec<u8>,
    pub expiry: u64,
    pub attempts: u32,
}

impl Slot {
    pub fn to_message(&self) -> crate::types::Message {
        crate::types::Message {
            id: self.id.clone(),
            role: self.role,
            msg_type: self.msg_type,
            payload: self.payload.clone(),
        }
    }
}

/// Which of the three lists a freshly-allocated slot should join.
pub enum ListKind {
    Ready,
    Wait,
    Timer,
}

/// A full point-in-time snapshot of pool contents, in list order. Used by
/// `snapshot.rs` — kept separate from `Slot` itself so the wire format isn't
/// coupled to internal field order by accident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub ready: Vec<Slot>,
    pub wait: Vec<Slot>,
    pub timer: Vec<Slot>,
}

/// Fixed-capacity slab of message slots plus the three intrusive-by-index lists.
pub struct Pool {
    slots: Vec<Option<Slot>>,
    ready: VecDeque<usize>,
    wait: VecDeque<usize>,
    timer: VecDeque<usize>,
}

impl Pool {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(TX_POOL_LEN);
        slots.resize_with(TX_POOL_LEN, || None);
        Self { slots, ready: VecDeque::new(), wait: VecDeque::new(), timer: VecDeque::new() }
    }

    /// Allocate a free slot, fill it with `slot`, and place it on `list`
    /// (at the front when `front` is true, spec §4.4's retry preemption).
    ///
    /// Allocation is a linear scan for the first free slot (spec §4.1).
    /// Returns `EngineError::OutOfMemory` if the pool is full; the caller
    /// decides whether to evict and retry (spec §4.7 `push_request` with `force`).
    pub fn alloc_into(&mut self, slot: Slot, list: ListKind, front: bool) -> Result<usize, EngineError> {
        let idx = self.slots.iter().position(Option::is_none).ok_or(EngineError::OutOfMemory)?;
        self.slots[idx] = Some(slot);
        let target = match list {
            ListKind::Ready => &mut self.ready,
            ListKind::Wait => &mut self.wait,
            ListKind::Timer => &mut self.timer,
        };
        if front {
            target.push_front(idx);
        } else {
            target.push_back(idx);
        }
        Ok(idx)
    }

    pub fn slot(&self, idx: usize) -> &Slot {
        self.slots[idx].as_ref().expect("slot index must refer to an occupied slot")
    }

    pub fn slot_mut(&mut self, idx: usize) -> &mut Slot {
        self.slots[idx].as_mut().expect("slot index must refer to an occupied slot")
    }

    /// Zero a slot (spec §3's slot-zero deallocation). The caller is
    /// responsible for having already removed `idx` from whichever list held
    /// it, and for having emitted `MESSAGE_FREE` beforehand (spec §3: "always
    /// emits MESSAGE_FREE before zeroing").
    pub fn free(&mut self, idx: usize) {
        self.slots[idx] = None;
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    pub fn wait_len(&self) -> usize {
        self.wait.len()
    }

    pub fn timer_len(&self) -> usize {
        self.timer.len()
    }

    pub fn count_pending(&self) -> usize {
        self.ready.len() + self.wait.len() + self.timer.len()
    }

    /// Pop the head of `ready` (spec §4.5 phase 2's transmit step).
    pub fn pop_ready(&mut self) -> Option<usize> {
        self.ready.pop_front()
    }

    pub fn push_ready_back(&mut self, idx: usize) {
        self.ready.push_back(idx);
    }

    /// Retries jump the queue (spec §4.4, §9).
    pub fn push_ready_front(&mut self, idx: usize) {
        self.ready.push_front(idx);
    }

    pub fn push_wait(&mut self, idx: usize) {
        self.wait.push_back(idx);
    }

    pub fn push_timer(&mut self, idx: usize) {
        self.timer.push_back(idx);
    }

    /// Remove a specific, already-known index from `wait` (spec §4.5 phase 3's
    /// correlation match, which removes exactly the matched slot rather than
    /// the head).
    pub fn remove_from_wait(&mut self, idx: usize) {
        if let Some(pos) = self.wait.iter().position(|&i| i == idx) {
            self.wait.remove(pos);
        }
    }

    /// All `wait` entries whose `expiry <= now`, removed from `wait` in their
    /// original relative order (spec §4.5 phase 1).
    pub fn pop_due_wait(&mut self, now: u64) -> Vec<usize> {
        Self::pop_due(&mut self.wait, &self.slots, now)
    }

    /// All `timer` entries whose `expiry <= now`, removed from `timer` (spec §4.5 phase 5).
    pub fn pop_due_timer(&mut self, now: u64) -> Vec<usize> {
        Self::pop_due(&mut self.timer, &self.slots, now)
    }

    /// Shared by both due-scans: takes the list and the slab as disjoint
    /// borrows (rather than re-deriving both through `&mut self`) so the
    /// expiry filter only ever holds a shared borrow of `slots`.
    fn pop_due(list: &mut VecDeque<usize>, slots: &[Option<Slot>], now: u64) -> Vec<usize> {
        let due: Vec<usize> =
            list.iter().copied().filter(|&idx| slots[idx].as_ref().expect("occupied").expiry <= now).collect();
        if due.is_empty() {
            return due;
        }
        list.retain(|idx| !due.contains(idx));
        due
    }

    /// Correlate an inbound response to a `wait` slot by prefix-equal id
    /// comparison: compare up to `idstr`'s length (spec §4.6). A slot whose
    /// id is shorter than `idstr` cannot match.
    pub fn find_in_wait_by_id(&self, idstr: &str) -> Option<usize> {
        let needle = idstr.as_bytes();
        self.wait.iter().copied().find(|&idx| {
            let hay = self.slots[idx].as_ref().expect("occupied").id.as_bytes();
            hay.get(..needle.len()) == Some(needle)
        })
    }

    /// Same prefix-equal lookup as [`Pool::find_in_wait_by_id`], for
    /// `type_from_idstr` (spec §4.7).
    pub fn type_in_wait_by_id(&self, idstr: &str) -> Option<MessageType> {
        self.find_in_wait_by_id(idstr).map(|idx| self.slot(idx).msg_type)
    }

    /// Walk `ready` from the head, free the first evictable slot, return its
    /// index (spec §4.8). Returns `None` if no slot in `ready` is evictable
    /// (`BootNotification`/`StartTransaction`/`StopTransaction` are exempt).
    ///
    /// Note this only considers `ready`, per spec §4.8 ("Walk ready from
    /// head"); `wait` and `timer` slots are never evicted.
    pub fn evict_oldest(&mut self) -> Option<usize> {
        let pos = self.ready.iter().position(|&idx| is_evictable(self.slots[idx].as_ref().expect("occupied").msg_type))?;
        self.ready.remove(pos)
    }

    /// Scan all three lists, removing every slot whose type matches
    /// `msg_type`. Returns the removed indices; the caller is responsible for
    /// emitting `MESSAGE_FREE` per slot and calling [`Pool::free`] (spec §4.7
    /// `drop_pending_type`).
    pub fn drop_pending_type(&mut self, msg_type: MessageType) -> Vec<usize> {
        let matches_type = |slots: &[Option<Slot>], idx: &usize| slots[*idx].as_ref().expect("occupied").msg_type == msg_type;

        let mut dropped = Vec::new();
        let ready_drop: Vec<usize> = self.ready.iter().copied().filter(|i| matches_type(&self.slots, i)).collect();
        self.ready.retain(|idx| !ready_drop.contains(idx));
        dropped.extend(ready_drop);

        let wait_drop: Vec<usize> = self.wait.iter().copied().filter(|i| matches_type(&self.slots, i)).collect();
        self.wait.retain(|idx| !wait_drop.contains(idx));
        dropped.extend(wait_drop);

        let timer_drop: Vec<usize> = self.timer.iter().copied().filter(|i| matches_type(&self.slots, i)).collect();
        self.timer.retain(|idx| !timer_drop.contains(idx));
        dropped.extend(timer_drop);

        dropped
    }

    /// Reset to the empty state (spec §4.7 `init`).
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.ready.clear();
        self.wait.clear();
        self.timer.clear();
    }

    /// Capture list contents, in list order, for snapshotting.
    pub fn export_snapshot(&self) -> PoolSnapshot {
        let collect = |deque: &VecDeque<usize>| deque.iter().map(|&idx| self.slot(idx).clone()).collect();
        PoolSnapshot { ready: collect(&self.ready), wait: collect(&self.wait), timer: collect(&self.timer) }
    }

    /// Restore from a [`PoolSnapshot`], replacing all current contents.
    ///
    /// Errors with `OutOfMemory` if the snapshot holds more slots than
    /// `TX_POOL_LEN` can accommodate.
    pub fn import_snapshot(&mut self, snapshot: PoolSnapshot) -> Result<(), EngineError> {
        let total = snapshot.ready.len() + snapshot.wait.len() + snapshot.timer.len();
        if total > TX_POOL_LEN {
            return Err(EngineError::OutOfMemory);
        }
        self.clear();
        for slot in snapshot.ready {
            self.alloc_into(slot, ListKind::Ready, false)?;
        }
        for slot in snapshot.wait {
            self.alloc_into(slot, ListKind::Wait, false)?;
        }
        for slot in snapshot.timer {
            self.alloc_into(slot, ListKind::Timer, false)?;
        }
        Ok(())
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}
