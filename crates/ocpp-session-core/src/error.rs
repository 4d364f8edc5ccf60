//! Structured error variants produced by the engine (spec §7).
//!
//! `thiserror` derives `Display`/`std::error::Error` so callers get useful
//! messages without the engine hand-rolling formatting.

use thiserror::Error;

/// Errors returned by `Transport::send`/`Transport::recv` implementations.
///
/// The engine treats any `Err` here as spec §7's `TRANSPORT_ERROR`: the
/// affected slot stays in its list, subject to the normal retry policy.
#[derive(Debug, Clone, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// Errors from snapshot capture/restore (spec §4.7, §6).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnapshotError {
    /// The buffer is too short to contain even a header.
    #[error("snapshot buffer too short: got {got} bytes, need at least {need}")]
    Truncated { got: usize, need: usize },

    /// The header's magic number did not match.
    #[error("snapshot magic mismatch: expected {expected:#x}, got {got:#x}")]
    BadMagic { expected: u32, got: u32 },

    /// The header declared a version this build does not support.
    #[error("unsupported snapshot version: {version}")]
    UnsupportedVersion { version: u16 },

    /// The header's declared length did not match the remaining buffer.
    #[error("snapshot length mismatch: header says {declared}, buffer has {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// The body could not be decoded once the header validated.
    #[error("snapshot body decode failed: {0}")]
    Decode(String),
}

/// Errors surfaced by the engine's public API (spec §7).
///
/// `NO_MESSAGE` from spec §7 is intentionally not a variant here: spec §7
/// calls it an internal sentinel never surfaced to callers, so it is
/// represented purely as `Transport::recv`'s `Ok(None)` (see `transport.rs`).
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The message pool is full and no slot could be freed (spec §4.1, §4.7).
    #[error("message pool exhausted")]
    OutOfMemory,

    /// An inbound CALLRESULT/CALLERROR matched no slot in the wait list (spec §7).
    #[error("no wait-list entry correlates with id {id:?}")]
    NoCorrelation { id: String },

    /// An inbound message declared a role the engine does not accept (spec §7).
    #[error("message has an invalid or undefined role")]
    InvalidRole,

    /// The host-provided transport failed (spec §7).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Snapshot capture or restore failed (spec §4.7, §6).
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
