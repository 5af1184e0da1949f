// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Key-Value Store
//!
//! The narrow contract the resolver and the upload utility need from the remote
//! store. Entries are addressed by `(namespace, kind, name)` and hold a single
//! string value.
//!
//! Two implementations ship with the crate:
//!
//! - [`memory::MemoryStore`]: an in-process map, used by tests and for
//!   store-less runs.
//! - [`datastore::DatastoreClient`]: the Cloud Datastore REST API, including
//!   the local emulator.

pub mod datastore;
pub mod memory;

use crate::errors::StoreError;
use async_trait::async_trait;
use std::fmt;

/// Composite address of a remote entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    pub namespace: Option<String>,
    pub kind: String,
    pub name: String,
}

impl StoreKey {
    /// Builds a key, upper-casing `name`.
    pub fn new(namespace: Option<&str>, kind: &str, name: &str) -> StoreKey {
        StoreKey {
            namespace: namespace.map(str::to_owned),
            kind: kind.to_owned(),
            name: name.to_uppercase(),
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}/{}/{}", self.kind, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// A stored entry. It carries its own key, so batched reads can be matched
/// back to their request regardless of ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub key: StoreKey,
    pub value: String,
}

impl Entity {
    pub fn new(key: StoreKey, value: impl Into<String>) -> Entity {
        Entity {
            key,
            value: value.into(),
        }
    }
}

/// Operations consumed from the remote store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetches the entries that exist among `keys`. Missing keys are simply
    /// absent from the result and the order is unspecified.
    async fn get_many(&self, keys: &[StoreKey]) -> Result<Vec<Entity>, StoreError>;

    /// Creates entries, failing with [`StoreError::AlreadyExists`] if any of
    /// them is already present.
    async fn insert(&self, entities: Vec<Entity>) -> Result<(), StoreError>;

    /// Creates or replaces entries.
    async fn save(&self, entities: Vec<Entity>) -> Result<(), StoreError>;

    /// Fetches a single entry.
    async fn get(&self, key: &StoreKey) -> Result<Option<Entity>, StoreError> {
        let found = self.get_many(std::slice::from_ref(key)).await?;
        Ok(found.into_iter().find(|e| &e.key == key))
    }
}
