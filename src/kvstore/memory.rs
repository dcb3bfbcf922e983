// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory key-value store.
//!
//! Backs tests that need to observe exactly which writes a flow performs;
//! nothing survives the process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KVStore, KVStoreResult};

/// Volatile store with a write counter.
#[derive(Default)]
pub struct MemoryKVStore {
    entries: RwLock<HashMap<String, serde_json::Value>>,
    writes: AtomicU64,
}

impl MemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls observed since construction.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl KVStore for MemoryKVStore {
    async fn get_raw(&self, key: &str) -> KVStoreResult<Option<serde_json::Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set_raw(&self, key: &str, value: serde_json::Value) -> KVStoreResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
