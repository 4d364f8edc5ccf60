//! Host-provided transport and identifier generation (spec §5, §6).
//!
//! These traits are the engine's only window onto the outside world: it
//! never opens a socket or serializes JSON itself (spec §1's explicit
//! out-of-scope list). Both `send` and `recv` may block; the engine always
//! calls them with its internal lock released (spec §5).

use crate::error::TransportError;
use crate::types::Message;

/// Host-provided message transport.
pub trait Transport: Send + Sync {
    /// Hand `msg` to the transport. `Ok(())` means accepted (spec §6: "0 = accepted").
    fn send(&self, msg: &Message) -> Result<(), TransportError>;

    /// Try to fetch one inbound message.
    ///
    /// `Ok(None)` is the `NO_MESSAGE`/`-ENOMSG` sentinel of spec §6/§7: no
    /// message was available. This is not an error — the engine's step
    /// phase 3 simply does nothing further for this tick.
    fn recv(&self) -> Result<Option<Message>, TransportError>;
}

/// Host-provided identifier generator (spec §6 `generate_id`).
///
/// # Correlation safety
///
/// `Pool::find_in_wait_by_id` (spec §4.6) uses a *prefix*-equal comparison,
/// not full equality, mirroring the source engine's `memcmp`-up-to-`strlen`
/// rule. That makes uniqueness of generated ids within the wait list a
/// precondition the generator itself must uphold (spec §3 invariant, §9
/// open question 3) — two concurrently in-flight ids where one is a prefix
/// of the other would alias under correlation.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Production `IdGenerator` using UUID v4, hyphenated (36 bytes, exactly
/// `MESSAGE_ID_MAXLEN`).
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MESSAGE_ID_MAXLEN;

    #[test]
    fn uuid_generator_produces_ids_within_the_length_budget() {
        let id = UuidGenerator.generate();
        assert_eq!(id.len(), MESSAGE_ID_MAXLEN);
    }

    #[test]
    fn uuid_generator_produces_distinct_ids() {
        let a = UuidGenerator.generate();
        let b = UuidGenerator.generate();
        assert_ne!(a, b);
    }
}
