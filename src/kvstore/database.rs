// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded key-value store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `documents`: key -> JSON document bytes
//!
//! One table holds every persisted document; callers namespace by key
//! (`chain-infos`, `access-origin-<chainId>`).

use std::path::Path;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{KVStore, KVStoreResult};

/// Single table: document key -> serialized JSON bytes.
const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// Durable store for the access-control core.
pub struct RedbKVStore {
    db: Database,
}

impl RedbKVStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> KVStoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(DOCUMENTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

#[async_trait]
impl KVStore for RedbKVStore {
    async fn get_raw(&self, key: &str) -> KVStoreResult<Option<serde_json::Value>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS)?;
        match table.get(key)? {
            Some(value) => {
                let document = serde_json::from_slice(value.value())?;
                Ok(Some(document))
            }
            None => Ok(None),
        }
    }

    async fn set_raw(&self, key: &str, value: serde_json::Value) -> KVStoreResult<()> {
        let json = serde_json::to_vec(&value)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(DOCUMENTS)?;
            table.insert(key, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
