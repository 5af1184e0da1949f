// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Environment Context
//!
//! The process environment is shared, global, mutable state. The resolver never
//! touches it directly; it goes through an [`EnvContext`] handed to it at
//! construction. Production code uses [`ProcessEnv`], tests use [`MemoryEnv`]
//! so they can run in parallel without stepping on each other.

use parking_lot::RwLock;
use std::{collections::HashMap, env};

/// Access to a key/value environment.
pub trait EnvContext: Send + Sync {
    /// Returns the value of `key`, or `None` when it is not set.
    fn get(&self, key: &str) -> Option<String>;

    /// Sets `key` to `value`.
    fn set(&self, key: &str, value: &str);

    /// Returns `true` when `key` is set.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvContext for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn set(&self, key: &str, value: &str) {
        // SAFETY: `DatastoreEnvironment::load_environment` is the only writer and
        // callers are required to finish loading before other threads read the
        // environment.
        unsafe { env::set_var(key, value) }
    }
}

/// An isolated in-memory environment.
#[derive(Debug, Default)]
pub struct MemoryEnv {
    vars: RwLock<HashMap<String, String>>,
}

impl MemoryEnv {
    pub fn new() -> MemoryEnv {
        MemoryEnv::default()
    }

    /// Fluent variant of [`EnvContext::set`] for building fixtures.
    pub fn with(self, key: &str, value: &str) -> Self {
        self.vars.write().insert(key.to_owned(), value.to_owned());
        self
    }

    /// A copy of every variable currently set.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.vars.read().clone()
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let vars = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        MemoryEnv {
            vars: RwLock::new(vars),
        }
    }
}

impl EnvContext for MemoryEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.vars.write().insert(key.to_owned(), value.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_env_is_isolated() {
        let env = MemoryEnv::new().with("A", "1");
        env.set("B", "2");

        assert_eq!(env.get("A").as_deref(), Some("1"));
        assert_eq!(env.get("B").as_deref(), Some("2"));
        assert!(!env.contains("C"));
        assert_eq!(env.snapshot().len(), 2);
    }

    #[test]
    fn memory_env_from_pairs() {
        let env: MemoryEnv = [("X", "y")].into_iter().collect();
        assert_eq!(env.get("X").as_deref(), Some("y"));
    }
}
