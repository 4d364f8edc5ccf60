//! Classification predicates (spec §4.2).
//!
//! These three predicates are the only place message-class policy is
//! decided; `retry.rs` and `engine.rs` consult them rather than matching on
//! `MessageType` directly, so the drop/evict asymmetry for `MeterValues`
//! (evictable but not droppable) lives in exactly one spot.

use crate::types::MessageType;

/// `is_transaction_related(type)` ⇔ type ∈ {StartTransaction, StopTransaction, MeterValues} (spec §4.2).
pub fn is_transaction_related(msg_type: MessageType) -> bool {
    matches!(
        msg_type,
        MessageType::StartTransaction | MessageType::StopTransaction | MessageType::MeterValues
    )
}

/// `is_droppable(msg)` ⇔ ¬is_transaction_related ∧ type ≠ BootNotification (spec §4.2).
///
/// Droppable messages may be silently freed once their attempt budget is
/// exhausted (spec §4.5 phase 1, §7).
pub fn is_droppable(msg_type: MessageType) -> bool {
    !is_transaction_related(msg_type) && msg_type != MessageType::BootNotification
}

/// `is_evictable(msg)` ⇔ type ∉ {BootNotification, StartTransaction, StopTransaction} (spec §4.2).
///
/// Note the asymmetry spec §4.2 calls out explicitly: `MeterValues` is
/// evictable even though it is not droppable.
pub fn is_evictable(msg_type: MessageType) -> bool {
    !matches!(
        msg_type,
        MessageType::BootNotification | MessageType::StartTransaction | MessageType::StopTransaction
    )
}
