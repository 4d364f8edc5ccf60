//! Foundational public types for the ocpp-session-core library.
//!
//! This module defines the vocabulary shared by every other module:
//! - [`MessageType`] — the closed OCPP 1.6 message-type set
//! - [`Role`] — CALL / CALLRESULT / CALLERROR / internal ALLOC state
//! - [`Message`] — the value the host sends and receives
//! - tuning constants from spec §6

/// Maximum length, in bytes, of a message identifier (spec §3, §6).
pub const MESSAGE_ID_MAXLEN: usize = 36;

/// Fixed capacity of the message pool (spec §3, default N=8).
pub const TX_POOL_LEN: usize = 8;

/// Default retry deadline, in seconds, for a CALL sitting in the wait list (spec §4.3).
pub const TX_TIMEOUT_SEC: u64 = 10;

/// Default attempt budget for droppable message types (spec §4.3).
pub const TX_RETRIES: u32 = 1;

/// Configuration key: heartbeat interval in seconds. `0` disables heartbeats.
pub const CONFIG_HEARTBEAT_INTERVAL: &str = "HeartbeatInterval";

/// Configuration key: base seconds for transaction-message backoff (spec §4.3).
pub const CONFIG_TX_RETRY_INTERVAL: &str = "TransactionMessageRetryInterval";

/// Configuration key: attempt budget for transaction-related CALLERROR retries.
pub const CONFIG_TX_ATTEMPTS: &str = "TransactionMessageAttempts";

/// The closed set of OCPP 1.6 message types the engine classifies and routes.
///
/// The core never inspects payload bytes; it only needs to know which bucket
/// a message falls into to apply the right retry/drop/eviction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MessageType {
    Authorize,
    BootNotification,
    Heartbeat,
    StartTransaction,
    StopTransaction,
    MeterValues,
    DataTransfer,
    StatusNotification,
    RemoteStartTransaction,
    RemoteStopTransaction,
    ChangeAvailability,
    ChangeConfiguration,
    ClearCache,
    GetConfiguration,
    Reset,
    UnlockConnector,
    FirmwareStatusNotification,
    UpdateFirmware,
    GetDiagnostics,
    DiagnosticsStatusNotification,
    ReserveNow,
    CancelReservation,
    SetChargingProfile,
    ClearChargingProfile,
    GetCompositeSchedule,
    TriggerMessage,
    GetLocalListVersion,
    SendLocalList,
    CertificateSigned,
    SignCertificate,
    SignedFirmwareStatusNotification,
    SignedUpdateFirmware,
}

impl MessageType {
    /// All variants, in declaration order. Used by `from_str` and tests.
    const ALL: &'static [MessageType] = &[
        MessageType::Authorize,
        MessageType::BootNotification,
        MessageType::Heartbeat,
        MessageType::StartTransaction,
        MessageType::StopTransaction,
        MessageType::MeterValues,
        MessageType::DataTransfer,
        MessageType::StatusNotification,
        MessageType::RemoteStartTransaction,
        MessageType::RemoteStopTransaction,
        MessageType::ChangeAvailability,
        MessageType::ChangeConfiguration,
        MessageType::ClearCache,
        MessageType::GetConfiguration,
        MessageType::Reset,
        MessageType::UnlockConnector,
        MessageType::FirmwareStatusNotification,
        MessageType::UpdateFirmware,
        MessageType::GetDiagnostics,
        MessageType::DiagnosticsStatusNotification,
        MessageType::ReserveNow,
        MessageType::CancelReservation,
        MessageType::SetChargingProfile,
        MessageType::ClearChargingProfile,
        MessageType::GetCompositeSchedule,
        MessageType::TriggerMessage,
        MessageType::GetLocalListVersion,
        MessageType::SendLocalList,
        MessageType::CertificateSigned,
        MessageType::SignCertificate,
        MessageType::SignedFirmwareStatusNotification,
        MessageType::SignedUpdateFirmware,
    ];

    /// Stringify for logs and for the `action` field of a CALL (spec §4.7 `stringify_type`).
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Authorize => "Authorize",
            MessageType::BootNotification => "BootNotification",
            MessageType::Heartbeat => "Heartbeat",
            MessageType::StartTransaction => "StartTransaction",
            MessageType::StopTransaction => "StopTransaction",
            MessageType::MeterValues => "MeterValues",
            MessageType::DataTransfer => "DataTransfer",
            MessageType::StatusNotification => "StatusNotification",
            MessageType::RemoteStartTransaction => "RemoteStartTransaction",
            MessageType::RemoteStopTransaction => "RemoteStopTransaction",
            MessageType::ChangeAvailability => "ChangeAvailability",
            MessageType::ChangeConfiguration => "ChangeConfiguration",
            MessageType::ClearCache => "ClearCache",
            MessageType::GetConfiguration => "GetConfiguration",
            MessageType::Reset => "Reset",
            MessageType::UnlockConnector => "UnlockConnector",
            MessageType::FirmwareStatusNotification => "FirmwareStatusNotification",
            MessageType::UpdateFirmware => "UpdateFirmware",
            MessageType::GetDiagnostics => "GetDiagnostics",
            MessageType::DiagnosticsStatusNotification => "DiagnosticsStatusNotification",
            MessageType::ReserveNow => "ReserveNow",
            MessageType::CancelReservation => "CancelReservation",
            MessageType::SetChargingProfile => "SetChargingProfile",
            MessageType::ClearChargingProfile => "ClearChargingProfile",
            MessageType::GetCompositeSchedule => "GetCompositeSchedule",
            MessageType::TriggerMessage => "TriggerMessage",
            MessageType::GetLocalListVersion => "GetLocalListVersion",
            MessageType::SendLocalList => "SendLocalList",
            MessageType::CertificateSigned => "CertificateSigned",
            MessageType::SignCertificate => "SignCertificate",
            MessageType::SignedFirmwareStatusNotification => "SignedFirmwareStatusNotification",
            MessageType::SignedUpdateFirmware => "SignedUpdateFirmware",
        }
    }

    /// Parse the wire `action` name back into a [`MessageType`] (spec §4.7 `type_from_string`).
    ///
    /// Returns `None` for any name outside the closed OCPP 1.6 set rather than
    /// introducing an "unknown" variant — the core has no business modeling
    /// messages it cannot classify.
    pub fn from_str(name: &str) -> Option<MessageType> {
        MessageType::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

/// Direction/kind of a message record (spec §3).
///
/// A free pool slot is modeled as `Option::None` at the `Vec<Option<Slot>>`
/// level (see `pool.rs`), not as a `Role` value — that is the Rust-safe
/// equivalent of the source's `NONE` role. `Alloc` models a slot reserved
/// but not yet filled with a type/payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Role {
    Alloc,
    Call,
    CallResult,
    CallError,
}

/// The value type exchanged with the host: over `Transport`, over the event
/// sink, and as the return value of push operations.
///
/// This is a projection of the pool's internal `Slot` — it carries no
/// `expiry`/`attempts` bookkeeping, which is the engine's business alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub msg_type: MessageType,
    pub payload: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stringify_round_trips_through_from_str() {
        for t in MessageType::ALL.iter().copied() {
            let name = t.as_str();
            assert_eq!(MessageType::from_str(name), Some(t), "round-trip failed for {name}");
        }
    }

    #[test]
    fn from_str_rejects_unknown_action() {
        assert_eq!(MessageType::from_str("NotARealAction"), None);
    }

    #[test]
    fn all_variants_have_distinct_names() {
        let mut seen = std::collections::HashSet::new();
        for t in MessageType::ALL.iter().copied() {
            assert!(seen.insert(t.as_str()), "duplicate name: {}", t.as_str());
        }
    }
}
