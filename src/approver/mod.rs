// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Generic suspend/resume broker for externally delivered decisions.
//!
//! A caller registers a payload under an opaque request id and suspends.
//! Some other party (the approval UI) later reads the payload and delivers
//! an approve or reject for that id, resuming the caller; if no decision
//! arrives before the deadline the caller resumes with a timeout.
//!
//! Resolution is exactly-once: the first of approve, reject, or timeout
//! clears the pending entry, and anything later fails with `NotFound`.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, Mutex};
use tracing::warn;

/// Errors produced by the approval broker.
#[derive(Debug, thiserror::Error)]
pub enum ApproverError {
    #[error("request {0} is already pending")]
    AlreadyPending(String),

    #[error("there is no pending request for {0}")]
    NotFound(String),

    #[error("request {0} was rejected")]
    Rejected(String),

    #[error("request {0} timed out waiting for a decision")]
    TimedOut(String),
}

pub type ApproverResult<T> = Result<T, ApproverError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Approved,
    Rejected,
}

/// A registered request waiting for its decision.
///
/// The sender half lives here and is consumed by the decision; the waiting
/// caller holds the receiver. An entry leaves the map exactly once.
struct Pending<T> {
    data: T,
    deadline: DateTime<Utc>,
    decide: oneshot::Sender<Decision>,
}

/// Suspends callers on a request id until an external approve/reject or a
/// deadline resolves them.
///
/// The payload type `T` carries whatever the approval UI needs to render
/// the prompt; the broker itself never interprets it.
pub struct AsyncApprover<T> {
    pending: Mutex<HashMap<String, Pending<T>>>,
    default_timeout: Duration,
}

impl<T: Clone> AsyncApprover<T> {
    /// Create a broker whose requests time out after `default_timeout`.
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            default_timeout,
        }
    }

    /// Register `data` under `id` and suspend until a decision or the
    /// deadline.
    ///
    /// Fails `AlreadyPending` without registering anything if `id` is
    /// already waiting. Returns `Ok(())` on approval, `Rejected` on
    /// rejection, and `TimedOut` when the deadline passes first.
    pub async fn request(&self, id: &str, data: T) -> ApproverResult<()> {
        let (decide, mut wait) = oneshot::channel();
        let deadline = Utc::now() + self.default_timeout;

        {
            let mut pending = self.pending.lock().await;
            if pending.contains_key(id) {
                return Err(ApproverError::AlreadyPending(id.to_string()));
            }
            pending.insert(
                id.to_string(),
                Pending {
                    data,
                    deadline,
                    decide,
                },
            );
        }

        match tokio::time::timeout(self.default_timeout, &mut wait).await {
            Ok(Ok(Decision::Approved)) => Ok(()),
            Ok(Ok(Decision::Rejected)) => Err(ApproverError::Rejected(id.to_string())),
            // Sender dropped without a decision: the entry was discarded.
            Ok(Err(_)) => Err(ApproverError::Rejected(id.to_string())),
            Err(_elapsed) => {
                let mut pending = self.pending.lock().await;
                if pending.remove(id).is_some() {
                    Err(ApproverError::TimedOut(id.to_string()))
                } else {
                    drop(pending);
                    // A decision beat the timer to the entry; honor it.
                    match wait.try_recv() {
                        Ok(Decision::Approved) => Ok(()),
                        _ => Err(ApproverError::Rejected(id.to_string())),
                    }
                }
            }
        }
    }

    /// Payload of a still-pending request, for rendering the prompt.
    pub async fn get_data(&self, id: &str) -> ApproverResult<T> {
        let pending = self.pending.lock().await;
        pending
            .get(id)
            .map(|entry| entry.data.clone())
            .ok_or_else(|| ApproverError::NotFound(id.to_string()))
    }

    /// Deadline of a still-pending request.
    pub async fn deadline(&self, id: &str) -> ApproverResult<DateTime<Utc>> {
        let pending = self.pending.lock().await;
        pending
            .get(id)
            .map(|entry| entry.deadline)
            .ok_or_else(|| ApproverError::NotFound(id.to_string()))
    }

    /// Whether `id` is currently waiting for a decision.
    pub async fn is_pending(&self, id: &str) -> bool {
        self.pending.lock().await.contains_key(id)
    }

    /// Ids of all requests currently waiting, sorted.
    pub async fn pending_ids(&self) -> Vec<String> {
        let pending = self.pending.lock().await;
        let mut ids: Vec<String> = pending.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Resolve `id` with approval, resuming its waiting caller.
    pub async fn approve(&self, id: &str) -> ApproverResult<()> {
        self.resolve(id, Decision::Approved).await
    }

    /// Resolve `id` with rejection, resuming its waiting caller.
    pub async fn reject(&self, id: &str) -> ApproverResult<()> {
        self.resolve(id, Decision::Rejected).await
    }

    async fn resolve(&self, id: &str, decision: Decision) -> ApproverResult<()> {
        let entry = self
            .pending
            .lock()
            .await
            .remove(id)
            .ok_or_else(|| ApproverError::NotFound(id.to_string()))?;

        // Send fails only when the waiting future was dropped; the entry is
        // cleared either way.
        if entry.decide.send(decision).is_err() {
            warn!(request_id = %id, "approval decision had no waiter");
        }
        Ok(())
    }
}
