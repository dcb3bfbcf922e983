// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Keeper configuration.
//!
//! Everything the access gate needs from its embedder is injected here at
//! construction: how long a pending approval may wait for a user decision,
//! where the approval UI lives, and which origin counts as the wallet's own.

use std::time::Duration;

use url::Url;

/// Default time a pending approval request may wait for a user decision.
pub const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_millis(180_000);

/// Configuration for [`ChainsKeeper`](crate::chains::ChainsKeeper).
#[derive(Debug, Clone)]
pub struct KeeperConfig {
    /// Base URL of the wallet's own UI. Approval prompt URLs are built
    /// relative to it.
    pub ui_base_url: Url,
    /// Origin whose requests bypass the grant check entirely.
    ///
    /// Defaults to the origin of `ui_base_url`. For base URLs whose scheme
    /// the URL standard treats as opaque (e.g. browser-extension schemes)
    /// this serializes as `"null"`; set the origin explicitly with
    /// [`with_trusted_origin`](Self::with_trusted_origin) in that case.
    pub trusted_origin: String,
    /// How long a pending approval request waits before timing out.
    pub approval_timeout: Duration,
}

impl KeeperConfig {
    /// Build a config with the default approval timeout and a trusted origin
    /// derived from `ui_base_url`.
    pub fn new(ui_base_url: Url) -> Self {
        let trusted_origin = ui_base_url.origin().ascii_serialization();
        Self {
            ui_base_url,
            trusted_origin,
            approval_timeout: DEFAULT_APPROVAL_TIMEOUT,
        }
    }

    /// Override the trusted origin.
    pub fn with_trusted_origin(mut self, origin: impl Into<String>) -> Self {
        self.trusted_origin = origin.into();
        self
    }

    /// Override the approval timeout.
    pub fn with_approval_timeout(mut self, timeout: Duration) -> Self {
        self.approval_timeout = timeout;
        self
    }

    /// URL the approval UI is opened at for a pending request id.
    pub fn access_prompt_url(&self, request_id: &str) -> String {
        format!("{}popup.html#/access?id={}", self.ui_base_url, request_id)
    }
}
