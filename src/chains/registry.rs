// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain catalog: a fixed embedded set merged with an append-only persisted
//! set.

use std::sync::Arc;

use tracing::info;

use super::types::ChainInfo;
use super::{KeeperError, KeeperResult};
use crate::kvstore::KVStore;

/// Store key holding the persisted chain catalog.
pub const CHAIN_INFOS_KEY: &str = "chain-infos";

/// Resolves chain ids against embedded and persisted chain metadata.
pub struct ChainRegistry {
    kv: Arc<dyn KVStore>,
    embedded: Vec<ChainInfo>,
}

impl ChainRegistry {
    pub fn new(kv: Arc<dyn KVStore>, embedded: Vec<ChainInfo>) -> Self {
        Self { kv, embedded }
    }

    /// All known chains: embedded entries first, persisted entries after,
    /// without deduplication.
    pub async fn get_chain_infos(&self) -> KeeperResult<Vec<ChainInfo>> {
        let mut infos = self.embedded.clone();
        if let Some(saved) = self.kv.get::<Vec<ChainInfo>>(CHAIN_INFOS_KEY).await? {
            infos.extend(saved);
        }
        Ok(infos)
    }

    /// First entry whose `chain_id` matches.
    pub async fn get_chain_info(&self, chain_id: &str) -> KeeperResult<ChainInfo> {
        self.get_chain_infos()
            .await?
            .into_iter()
            .find(|info| info.chain_id == chain_id)
            .ok_or_else(|| KeeperError::ChainNotFound(chain_id.to_string()))
    }

    /// Append a chain to the persisted catalog.
    ///
    /// The catalog is append-only and `chain_id` is a unique key, so a chain
    /// that is already known (embedded or persisted) is refused.
    pub async fn add_chain_info(&self, info: ChainInfo) -> KeeperResult<()> {
        let known = self.get_chain_infos().await?;
        if known.iter().any(|existing| existing.chain_id == info.chain_id) {
            return Err(KeeperError::ChainAlreadyRegistered(info.chain_id));
        }

        let mut saved = self
            .kv
            .get::<Vec<ChainInfo>>(CHAIN_INFOS_KEY)
            .await?
            .unwrap_or_default();
        saved.push(info.clone());
        self.kv.set(CHAIN_INFOS_KEY, &saved).await?;

        info!(chain_id = %info.chain_id, "chain added to persisted catalog");
        Ok(())
    }
}
