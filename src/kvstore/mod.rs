// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Durable key -> JSON document store.
//!
//! The access-control core persists two document shapes through this trait:
//! the appended chain catalog (`chain-infos`) and one grant record per chain
//! (`access-origin-<chainId>`). Backends:
//!
//! - [`MemoryKVStore`] - in-memory, write-counting; the test double
//! - [`RedbKVStore`] - embedded ACID database; the production backend

pub mod database;
pub mod memory;

pub use database::RedbKVStore;
pub use memory::MemoryKVStore;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Error type for key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum KVStoreError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type KVStoreResult<T> = Result<T, KVStoreError>;

/// Async key -> JSON mapping.
///
/// Object-safe so callers can hold `Arc<dyn KVStore>`; the typed helpers
/// below layer serde on top of the raw JSON methods.
#[async_trait]
pub trait KVStore: Send + Sync {
    /// Fetch the document stored under `key`, if any.
    async fn get_raw(&self, key: &str) -> KVStoreResult<Option<serde_json::Value>>;

    /// Store `value` under `key`, replacing any existing document.
    async fn set_raw(&self, key: &str, value: serde_json::Value) -> KVStoreResult<()>;
}

impl dyn KVStore {
    /// Fetch and deserialize the document stored under `key`, if any.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> KVStoreResult<Option<T>> {
        match self.get_raw(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store `value` under `key`.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> KVStoreResult<()> {
        self.set_raw(key, serde_json::to_value(value)?).await
    }
}
