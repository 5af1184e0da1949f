// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! In-process [`KeyValueStore`].
//!
//! Counts every round trip so callers can assert how often the store was hit.

use super::{Entity, KeyValueStore, StoreKey};
use crate::errors::StoreError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<StoreKey, String>>,
    reads: AtomicUsize,
    inserts: AtomicUsize,
    saves: AtomicUsize,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Seeds an entry without counting it as a write.
    pub fn put(&self, key: StoreKey, value: &str) {
        self.entries.write().insert(key, value.to_owned());
    }

    /// Current value stored under `key`.
    pub fn value(&self, key: &StoreKey) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Makes every subsequent `insert` and `save` fail with a request error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `get_many` fail with a request error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of `get_many` calls served.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `insert` calls served, failed ones included.
    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Number of `save` calls served, failed ones included.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Request("memory store is read-only".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_many(&self, keys: &[StoreKey]) -> Result<Vec<Entity>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Request("memory store is unreachable".into()));
        }

        let entries = self.entries.read();
        Ok(keys
            .iter()
            .filter_map(|key| {
                entries
                    .get(key)
                    .map(|value| Entity::new(key.clone(), value.clone()))
            })
            .collect())
    }

    async fn insert(&self, entities: Vec<Entity>) -> Result<(), StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;

        let mut entries = self.entries.write();
        if let Some(existing) = entities.iter().find(|e| entries.contains_key(&e.key)) {
            return Err(StoreError::AlreadyExists(existing.key.name.clone()));
        }
        for entity in entities {
            entries.insert(entity.key, entity.value);
        }
        Ok(())
    }

    async fn save(&self, entities: Vec<Entity>) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;

        let mut entries = self.entries.write();
        for entity in entities {
            entries.insert(entity.key, entity.value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> StoreKey {
        StoreKey::new(None, "Env", name)
    }

    #[tokio::test]
    async fn insert_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.put(key("B"), "old");

        let err = store
            .insert(vec![Entity::new(key("A"), "1"), Entity::new(key("B"), "2")])
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::AlreadyExists("B".into()));
        assert_eq!(store.value(&key("A")), None);
        assert_eq!(store.value(&key("B")).as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn save_overwrites() {
        let store = MemoryStore::new();
        store.put(key("A"), "old");

        store.save(vec![Entity::new(key("A"), "new")]).await.unwrap();

        assert_eq!(store.value(&key("A")).as_deref(), Some("new"));
        assert_eq!(store.saves(), 1);
    }

    #[tokio::test]
    async fn single_get_goes_through_get_many() {
        let store = MemoryStore::new();
        store.put(key("A"), "1");

        let found = store.get(&key("A")).await.unwrap();
        let missing = store.get(&key("Z")).await.unwrap();

        assert_eq!(found.map(|e| e.value).as_deref(), Some("1"));
        assert!(missing.is_none());
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn failing_reads_return_request_errors() {
        let store = MemoryStore::new();
        store.put(key("A"), "1");
        store.fail_reads(true);

        let err = store.get_many(&[key("A")]).await.unwrap_err();

        assert_eq!(err, StoreError::Request("memory store is unreachable".into()));
        assert_eq!(store.reads(), 1);
    }

    #[tokio::test]
    async fn namespaces_are_distinct() {
        let store = MemoryStore::new();
        store.put(StoreKey::new(Some("a"), "Env", "K"), "in-a");

        let found = store
            .get_many(&[StoreKey::new(Some("b"), "Env", "K")])
            .await
            .unwrap();

        assert!(found.is_empty());
    }
}
