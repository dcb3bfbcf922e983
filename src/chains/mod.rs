// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain catalog, per-chain origin grants, and the access gate.
//!
//! - [`ChainRegistry`] resolves chain ids to static metadata
//! - [`AccessOriginStore`] holds the per-chain approved-origin records
//! - [`ChainsKeeper`] orchestrates the authorization flow end to end

pub mod access;
pub mod keeper;
pub mod registry;
pub mod types;

pub use access::AccessOriginStore;
pub use keeper::{ApprovalPrompt, ChainsKeeper};
pub use registry::ChainRegistry;
pub use types::{AccessOrigin, ChainInfo};

use crate::approver::ApproverError;
use crate::kvstore::KVStoreError;

/// Errors produced by the access-control subsystem.
///
/// Pending-request failures (`AlreadyPending`, `Rejected`, `TimedOut`)
/// surface through the `Approver` variant.
#[derive(Debug, thiserror::Error)]
pub enum KeeperError {
    #[error("there is no chain info for {0}")]
    ChainNotFound(String),

    #[error("chain {0} is already registered")]
    ChainAlreadyRegistered(String),

    #[error("empty origin")]
    EmptyOrigins,

    #[error("origin {0} is not approved")]
    NotApproved(String),

    #[error("there is no matched origin")]
    AccessRecordNotFound,

    #[error(transparent)]
    Approver(#[from] ApproverError),

    #[error("store error: {0}")]
    Store(#[from] KVStoreError),
}

pub type KeeperResult<T> = Result<T, KeeperError>;
