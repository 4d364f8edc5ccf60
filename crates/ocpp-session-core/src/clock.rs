//! Host-provided time source (spec §5, §6, §9).
//!
//! The engine treats `now()` as a non-decreasing counter of whole seconds;
//! it tolerates it being non-monotonic only within a single `step` call
//! (spec §1). Millisecond precision is never assumed (spec §9).

use std::time::{SystemTime, UNIX_EPOCH};

/// Host-provided wall-clock source.
pub trait Clock: Send + Sync {
    /// Non-decreasing wall-clock seconds (spec §6).
    fn now(&self) -> u64;
}

/// Production `Clock` backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before UNIX epoch").as_secs()
    }
}
