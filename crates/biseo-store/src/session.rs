//! Short-lived confirmation sessions.
//!
//! A session is created when the assistant shows the user a set of
//! candidates and lives until the user acts on it, cancels it, or its TTL
//! passes.  Every entry records the user that created it; lookups by any
//! other user fail with [`StoreError::ForeignSession`].
//!
//! Expiry is lazy: an expired entry is removed the first time it is touched.
//! [`SessionStore::spawn_sweeper`] bounds memory for entries nobody touches
//! again.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{StoreError, StoreResult};

/// Build a fresh session id for `user_id`.
///
/// The user prefix makes ids readable in logs; the UUID v7 suffix keeps them
/// unique and roughly time-ordered.
pub fn new_session_id(user_id: &str) -> String {
    format!("{user_id}-{}", Uuid::now_v7().simple())
}

#[derive(Debug)]
struct Entry<P> {
    owner: String,
    payload: P,
    stored_at: DateTime<Utc>,
    ttl: TimeDelta,
}

impl<P> Entry<P> {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.stored_at + self.ttl
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  SessionStore
// ═══════════════════════════════════════════════════════════════════════

/// Concurrent map of session id to payload with per-entry TTL.
pub struct SessionStore<P> {
    entries: DashMap<String, Entry<P>>,
    clock: Arc<dyn Clock>,
}

impl<P> SessionStore<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Store `payload` under `id` for `ttl`, replacing any previous entry.
    #[instrument(skip(self, payload), fields(ttl_secs = ttl.as_secs()))]
    pub fn put(&self, id: &str, owner: &str, payload: P, ttl: Duration) {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::days(365));
        self.entries.insert(
            id.to_string(),
            Entry {
                owner: owner.to_string(),
                payload,
                stored_at: self.clock.now(),
                ttl,
            },
        );
        debug!("session stored");
    }

    /// Return a copy of the payload without consuming the session.
    pub fn get(&self, id: &str, user_id: &str) -> StoreResult<P> {
        self.check(id, user_id)?;
        self.entries
            .get(id)
            .map(|entry| entry.payload.clone())
            .ok_or_else(|| not_found(id))
    }

    /// Atomically remove and return the payload.
    ///
    /// Of several concurrent callers at most one receives `Ok`; the rest see
    /// [`StoreError::SessionNotFound`].
    #[instrument(skip(self))]
    pub fn take(&self, id: &str, user_id: &str) -> StoreResult<P> {
        let now = self.clock.now();
        let mut foreign = false;
        let removed = self.entries.remove_if(id, |_, entry| {
            if entry.expired(now) {
                return true;
            }
            if entry.owner != user_id {
                foreign = true;
                return false;
            }
            true
        });

        match removed {
            Some((_, entry)) if !entry.expired(now) => {
                debug!("session claimed");
                Ok(entry.payload)
            }
            Some(_) => {
                debug!("session expired on claim");
                Err(not_found(id))
            }
            None if foreign => Err(StoreError::ForeignSession {
                id: id.to_string(),
                user_id: user_id.to_string(),
            }),
            None => Err(not_found(id)),
        }
    }

    /// Mutate the payload in place under the entry lock.
    ///
    /// The closure runs at most once and sees the latest payload.  The
    /// session's TTL is not refreshed.
    pub fn update<R>(
        &self,
        id: &str,
        user_id: &str,
        apply: impl FnOnce(&mut P) -> R,
    ) -> StoreResult<R> {
        self.check(id, user_id)?;
        let mut entry = self.entries.get_mut(id).ok_or_else(|| not_found(id))?;
        Ok(apply(&mut entry.payload))
    }

    /// Drop a session regardless of owner.  Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Remove every expired entry and return how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.expired(now));
        let dropped = before.saturating_sub(self.entries.len());
        if dropped > 0 {
            debug!(dropped, "expired sessions swept");
        }
        dropped
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run [`sweep`](Self::sweep) every `every` on the current runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.sweep();
            }
        })
    }

    /// Validate existence, expiry, and ownership, removing the entry if it
    /// has expired.  The read guard is released before any removal.
    fn check(&self, id: &str, user_id: &str) -> StoreResult<()> {
        let now = self.clock.now();
        let (expired, owner_matches) = match self.entries.get(id) {
            Some(entry) => (entry.expired(now), entry.owner == user_id),
            None => return Err(not_found(id)),
        };

        if expired {
            self.entries.remove_if(id, |_, entry| entry.expired(now));
            debug!(session_id = id, "session expired");
            return Err(not_found(id));
        }
        if !owner_matches {
            return Err(StoreError::ForeignSession {
                id: id.to_string(),
                user_id: user_id.to_string(),
            });
        }
        Ok(())
    }
}

fn not_found(id: &str) -> StoreError {
    StoreError::SessionNotFound { id: id.to_string() }
}
