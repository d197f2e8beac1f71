//! Pending URL sessions
//!
//! Each user has at most one URL waiting for an action. Entries live in a
//! bounded cache and expire on their own, so abandoned prompts do not
//! accumulate for the lifetime of the process.

use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;
use tracing::debug;

/// Storage for the URL each user submitted most recently.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores `url` for the user, replacing any previous entry.
    async fn put(&self, user_id: i64, url: String);

    /// Returns the pending URL, or `None` if there is no live entry.
    async fn get(&self, user_id: i64) -> Option<String>;

    /// Drops the pending URL for the user.
    async fn clear(&self, user_id: i64);
}

/// In-memory session store backed by a `moka` cache with TTL and capacity bound.
#[derive(Clone)]
pub struct MokaSessionStore {
    cache: Cache<i64, String>,
}

impl MokaSessionStore {
    /// Creates a store whose entries expire `ttl_secs` after insertion.
    ///
    /// # Arguments
    ///
    /// * `ttl_secs` - Lifetime of a pending URL
    /// * `max_capacity` - Maximum number of users tracked at once
    ///
    /// # Examples
    ///
    /// ```
    /// use linkqr_bot::session::MokaSessionStore;
    ///
    /// let store = MokaSessionStore::new(600, 10_000);
    /// assert_eq!(store.entry_count(), 0);
    /// ```
    #[must_use]
    pub fn new(ttl_secs: u64, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { cache }
    }

    /// Approximate number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl SessionStore for MokaSessionStore {
    async fn put(&self, user_id: i64, url: String) {
        debug!(user_id, "Storing pending URL");
        self.cache.insert(user_id, url).await;
    }

    async fn get(&self, user_id: i64) -> Option<String> {
        self.cache.get(&user_id).await
    }

    async fn clear(&self, user_id: i64) {
        self.cache.invalidate(&user_id).await;
    }
}
