//! Lifecycle event dispatch (spec §4.9).
//!
//! Each event carries the affected message, except the transport-error case
//! (spec §4.9's "negative values propagate the numeric error from a failed
//! receive"), which has no associated message. The sink is invoked with the
//! engine's internal lock released (spec §5), so a host handler is free to
//! re-enter the engine — e.g. calling `push_response` from inside an
//! `Incoming` callback for a freshly-received CALL — without deadlocking.

use crate::error::TransportError;
use crate::types::Message;

/// A lifecycle event delivered to the host (spec §4.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// After a successful receive (`MESSAGE_INCOMING`, code 0).
    Incoming(Message),
    /// Reserved: the engine does not currently raise this (`MESSAGE_OUTGOING`, code 1).
    Outgoing(Message),
    /// Just before a slot is zeroed (`MESSAGE_FREE`, code 2).
    Free(Message),
    /// A failed receive.
    Error(TransportError),
}

/// Host callback invoked on every lifecycle transition.
///
/// Boxed as `dyn FnMut` rather than a generic parameter on `Engine` so the
/// engine's type doesn't leak every closure's unique type into callers —
/// matching the teacher crate's preference for trait objects at true host
/// boundaries (`Transport`, `IdGenerator`) over monomorphized generics.
pub type EventSink = Box<dyn FnMut(Event) + Send>;
