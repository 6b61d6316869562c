// ABOUTME: Per-conversation turn serialization keyed by caller and conversation id
// ABOUTME: Entries are created on demand and removed once no turn holds or awaits them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type TurnKey = (String, String);

/// Async locks ordering turns that target the same conversation
///
/// Turns on different conversations never wait on each other.
#[derive(Debug, Default)]
pub struct TurnLocks {
    locks: DashMap<TurnKey, Arc<Mutex<()>>>,
}

impl TurnLocks {
    /// Create an empty lock table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other turn runs on `(owner_key, conversation_id)`
    pub async fn acquire(&self, owner_key: &str, conversation_id: &str) -> TurnGuard<'_> {
        let key = (owner_key.to_owned(), conversation_id.to_owned());
        let mutex = Arc::clone(self.locks.entry(key.clone()).or_default().value());
        let guard = mutex.lock_owned().await;
        TurnGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    /// Number of conversations with an active or waiting turn
    #[must_use]
    pub fn active(&self) -> usize {
        self.locks.len()
    }
}

/// Held for the duration of one turn
pub struct TurnGuard<'a> {
    locks: &'a TurnLocks,
    key: TurnKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        // Release first so the guard's own reference does not count as a waiter
        drop(self.guard.take());
        self.locks
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
