//! ocpp-session-core: message-lifecycle engine for an OCPP 1.6 charge-point session.
//!
//! This crate owns message allocation, the ready/wait/timer queue discipline,
//! retry and heartbeat timing, and response correlation. It never opens a
//! socket or serializes JSON — those are the host's job, reached through the
//! [`Transport`], [`Clock`], and [`IdGenerator`] traits.

pub mod classify;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod pool;
pub mod retry;
pub mod snapshot;
pub mod transport;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use config::ConfigStore;
pub use engine::Engine;
pub use error::{EngineError, SnapshotError, TransportError};
pub use event::{Event, EventSink};
pub use transport::{IdGenerator, Transport, UuidGenerator};
pub use types::{
    Message, MessageType, Role, CONFIG_HEARTBEAT_INTERVAL, CONFIG_TX_ATTEMPTS, CONFIG_TX_RETRY_INTERVAL,
    MESSAGE_ID_MAXLEN, TX_POOL_LEN, TX_RETRIES, TX_TIMEOUT_SEC,
};
