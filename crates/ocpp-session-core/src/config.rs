//! Configuration store (spec §2 component 2, §5, §6).
//!
//! Guarded by its own `Mutex`, independent of the engine's lock — spec §5 is
//! explicit that the configuration lock must be separate, so that a host
//! reading configuration from inside an event callback (itself invoked with
//! the engine lock released, spec §4.9) can never deadlock against a thread
//! that is mid-`step` holding the engine lock.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::types::{CONFIG_HEARTBEAT_INTERVAL, CONFIG_TX_ATTEMPTS, CONFIG_TX_RETRY_INTERVAL};

/// A typed configuration value. The core only ever needs integers, but the
/// variant keeps the door open for string-valued keys a host might also
/// want to round-trip through the same store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Int(i64),
    Str(String),
}

impl ConfigValue {
    fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(v) => Some(*v),
            ConfigValue::Str(_) => None,
        }
    }
}

struct ConfigState {
    values: HashMap<&'static str, ConfigValue>,
}

/// Keyed configuration store with typed get/set (spec §2 component 2, §6).
pub struct ConfigStore {
    state: Mutex<ConfigState>,
}

impl ConfigStore {
    /// Build a store seeded with the defaults this engine relies on.
    ///
    /// `HeartbeatInterval` defaults to `0` ("0 disables heartbeats", spec
    /// §6); `TransactionMessageRetryInterval` defaults to `0`;
    /// `TransactionMessageAttempts` defaults to `1`, matching
    /// `TX_RETRIES + 1`'s single-attempt-then-done behavior for an
    /// unconfigured host.
    pub fn new() -> Self {
        let mut values = HashMap::new();
        values.insert(CONFIG_HEARTBEAT_INTERVAL, ConfigValue::Int(0));
        values.insert(CONFIG_TX_RETRY_INTERVAL, ConfigValue::Int(0));
        values.insert(CONFIG_TX_ATTEMPTS, ConfigValue::Int(1));
        Self { state: Mutex::new(ConfigState { values }) }
    }

    /// Read an integer-valued key. Returns `None` if the key is unset or not an integer.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.state
            .lock()
            .expect("config mutex poisoned")
            .values
            .get(key)
            .and_then(ConfigValue::as_int)
    }

    /// Read a string-valued key.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.state.lock().expect("config mutex poisoned").values.get(key) {
            Some(ConfigValue::Str(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// Set an integer-valued key.
    pub fn set_int(&self, key: &'static str, value: i64) {
        self.state
            .lock()
            .expect("config mutex poisoned")
            .values
            .insert(key, ConfigValue::Int(value));
    }

    /// Set a string-valued key.
    pub fn set_str(&self, key: &'static str, value: String) {
        self.state
            .lock()
            .expect("config mutex poisoned")
            .values
            .insert(key, ConfigValue::Str(value));
    }

    /// Whether `key` is read-only to the host (spec §6's `out_readonly`).
    ///
    /// All three keys this engine consumes are host-writable; this returns
    /// `false` for them and `true` for anything else, since an unrecognized
    /// key has no setter path the engine defines.
    pub fn read_only(&self, key: &str) -> bool {
        !matches!(
            key,
            CONFIG_HEARTBEAT_INTERVAL | CONFIG_TX_RETRY_INTERVAL | CONFIG_TX_ATTEMPTS
        )
    }

    /// Reset to the default values (used by `Engine::init`).
    pub fn reset_to_defaults(&self) {
        let mut state = self.state.lock().expect("config mutex poisoned");
        state.values.clear();
        state.values.insert(CONFIG_HEARTBEAT_INTERVAL, ConfigValue::Int(0));
        state.values.insert(CONFIG_TX_RETRY_INTERVAL, ConfigValue::Int(0));
        state.values.insert(CONFIG_TX_ATTEMPTS, ConfigValue::Int(1));
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
