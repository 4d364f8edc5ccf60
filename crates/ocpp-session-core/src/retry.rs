//! Retry/expiry policy (spec §4.3).
//!
//! Two distinct horizons are computed here and nowhere else:
//! - [`retry_deadline`] — how long a CALL may sit in `wait` before being
//!   requeued (always `TX_TIMEOUT_SEC`, independent of message class).
//! - [`next_send_period`] — the backoff applied when a CALLERROR response
//!   triggers another attempt, which *does* depend on message class.

use crate::classify::is_transaction_related;
use crate::config::ConfigStore;
use crate::types::{MessageType, CONFIG_HEARTBEAT_INTERVAL, CONFIG_TX_ATTEMPTS, CONFIG_TX_RETRY_INTERVAL, TX_TIMEOUT_SEC};

/// Retry deadline: the absolute second at which a `wait`-list slot times out
/// and is requeued or dropped (spec §4.3, §4.5 phase 1/2).
pub fn retry_deadline(now: u64) -> u64 {
    now + TX_TIMEOUT_SEC
}

/// Next-send period: the backoff horizon used when computing a fresh expiry
/// for transaction-related CALLERROR retries, heartbeats, and boot
/// notification re-sends (spec §4.3).
///
/// - Transaction-related: `now + TransactionMessageRetryInterval × attempts`
///   (arithmetic backoff in units of attempts already made).
/// - BootNotification / Heartbeat: `now + HeartbeatInterval`.
/// - Everything else: `now + TX_TIMEOUT_SEC`.
pub fn next_send_period(now: u64, msg_type: MessageType, attempts: u32, config: &ConfigStore) -> u64 {
    if is_transaction_related(msg_type) {
        let base = config.get_int(CONFIG_TX_RETRY_INTERVAL).unwrap_or(0).max(0) as u64;
        now + base * attempts as u64
    } else if matches!(msg_type, MessageType::BootNotification | MessageType::Heartbeat) {
        let interval = config.get_int(CONFIG_HEARTBEAT_INTERVAL).unwrap_or(0).max(0) as u64;
        now + interval
    } else {
        now + TX_TIMEOUT_SEC
    }
}

/// Attempt budget for droppable messages: `TX_RETRIES + 1` total attempts
/// before the slot is freed (spec §4.3, §8 property 5).
///
/// For transaction-related messages receiving CALLERROR, the budget instead
/// comes from the host-configured `TransactionMessageAttempts` (spec §4.3,
/// §8 scenario E).
pub fn attempt_budget(msg_type: MessageType, config: &ConfigStore) -> u32 {
    if is_transaction_related(msg_type) {
        config
            .get_int(CONFIG_TX_ATTEMPTS)
            .filter(|v| *v > 0)
            .map(|v| v as u32)
            .unwrap_or(1)
    } else {
        crate::types::TX_RETRIES + 1
    }
}
