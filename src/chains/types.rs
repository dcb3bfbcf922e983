// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain catalog and grant record types.
//!
//! Both types serialize with camelCase field names to match the JSON
//! documents the durable store holds.

use serde::{Deserialize, Serialize};

/// Static metadata for one chain identity.
///
/// `chain_id` is the unique, immutable key; an entry is never mutated or
/// deleted once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub chain_id: String,
    pub chain_name: String,
    /// Tendermint RPC endpoint.
    pub rpc: String,
    /// REST (LCD) endpoint.
    pub rest: String,
}

/// Origins currently permitted to act against one chain.
///
/// Persisted lazily on first grant under `access-origin-<chainId>`; origin
/// entries come and go but the record itself is never deleted. `origins` is
/// a list, not a set - duplicates are representable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessOrigin {
    pub chain_id: String,
    pub origins: Vec<String>,
}

impl AccessOrigin {
    /// Record for a chain with nothing granted yet.
    pub fn empty(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            origins: Vec::new(),
        }
    }
}
