// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-chain approved-origin records.
//!
//! Reads merge embedded defaults with the persisted record for the chain.
//! Writes are read-modify-write cycles against the durable store and are
//! serialized per chain id; two grants racing on the same chain would
//! otherwise drop one another's entries.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use super::types::AccessOrigin;
use super::{KeeperError, KeeperResult};
use crate::kvstore::KVStore;

/// Store key holding the grant record for `chain_id`.
fn access_origin_key(chain_id: &str) -> String {
    format!("access-origin-{chain_id}")
}

/// Persisted set of approved origins per chain, over embedded defaults.
pub struct AccessOriginStore {
    kv: Arc<dyn KVStore>,
    embedded: Vec<AccessOrigin>,
    chain_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AccessOriginStore {
    pub fn new(kv: Arc<dyn KVStore>, embedded: Vec<AccessOrigin>) -> Self {
        Self {
            kv,
            embedded,
            chain_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Lock guarding read-modify-write cycles for one chain.
    async fn chain_lock(&self, chain_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.chain_locks.lock().await;
        locks
            .entry(chain_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn embedded_origins(&self, chain_id: &str) -> Vec<String> {
        for access in &self.embedded {
            if access.chain_id == chain_id {
                return access.origins.clone();
            }
        }
        Vec::new()
    }

    /// Embedded defaults for `chain_id` followed by its persisted origins.
    ///
    /// A chain with no record in either source yields an empty list, never
    /// an error.
    pub async fn get_access_origin(&self, chain_id: &str) -> KeeperResult<AccessOrigin> {
        let mut origins = self.embedded_origins(chain_id);
        if let Some(saved) = self
            .kv
            .get::<AccessOrigin>(&access_origin_key(chain_id))
            .await?
        {
            origins.extend(saved.origins);
        }
        Ok(AccessOrigin {
            chain_id: chain_id.to_string(),
            origins,
        })
    }

    /// Persisted origins only - what a user may revoke. Embedded defaults
    /// are not theirs to remove.
    pub async fn get_access_origin_without_embed(
        &self,
        chain_id: &str,
    ) -> KeeperResult<AccessOrigin> {
        Ok(self
            .kv
            .get::<AccessOrigin>(&access_origin_key(chain_id))
            .await?
            .unwrap_or_else(|| AccessOrigin::empty(chain_id)))
    }

    /// Append one origin to the persisted record for `chain_id`.
    pub async fn add_access_origin(&self, chain_id: &str, origin: &str) -> KeeperResult<()> {
        self.add_access_origins(chain_id, &[origin.to_string()]).await
    }

    /// Append `origins` to the persisted record for `chain_id` in a single
    /// read-modify-write, creating the record if absent.
    ///
    /// Duplicates are not filtered; the record keeps list semantics.
    pub async fn add_access_origins(&self, chain_id: &str, origins: &[String]) -> KeeperResult<()> {
        let lock = self.chain_lock(chain_id).await;
        let _guard = lock.lock().await;

        let key = access_origin_key(chain_id);
        let mut record = self
            .kv
            .get::<AccessOrigin>(&key)
            .await?
            .unwrap_or_else(|| AccessOrigin::empty(chain_id));

        record.origins.extend(origins.iter().cloned());
        self.kv.set(&key, &record).await?;

        info!(chain_id = %chain_id, origins = ?origins, "origins granted");
        Ok(())
    }

    /// Remove the first occurrence of `origin` from the persisted record.
    ///
    /// Fails when no record exists for `chain_id` or the origin is not in
    /// it; embedded defaults are invisible here.
    pub async fn remove_access_origin(&self, chain_id: &str, origin: &str) -> KeeperResult<()> {
        let lock = self.chain_lock(chain_id).await;
        let _guard = lock.lock().await;

        let key = access_origin_key(chain_id);
        let mut record = self
            .kv
            .get::<AccessOrigin>(&key)
            .await?
            .ok_or(KeeperError::AccessRecordNotFound)?;

        let index = record
            .origins
            .iter()
            .position(|existing| existing == origin)
            .ok_or(KeeperError::AccessRecordNotFound)?;
        record.origins.remove(index);

        self.kv.set(&key, &record).await?;

        info!(chain_id = %chain_id, origin = %origin, "origin grant revoked");
        Ok(())
    }
}
