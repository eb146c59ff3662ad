//! Query cache: fetched server data keyed by request parameters.
//!
//! Semantics:
//! - data younger than `stale_time` and not invalidated is served without a
//!   request;
//! - concurrent fetches of the same key share one request;
//! - failed fetches are retried `retry` times with exponential backoff, and
//!   the last good data is kept next to the error;
//! - entries not refreshed within `gc_time` are dropped;
//! - with a [`Persister`], every change is written to storage and
//!   [`QueryCache::restore`] reloads it at startup.
//!
//! Data is stored as JSON values so one cache can hold any serde type and
//! be dehydrated as is.

mod persist;

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;

pub use persist::{
    DEFAULT_MAX_AGE, DEFAULT_STORAGE_KEY, FileStorage, MemoryStorage, Persister, Storage,
};

use crate::ClientError;
use persist::{PersistedQuery, age};

/// Upper bound for the delay between retries.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Hierarchical cache key, e.g. `["transactions", "user_1"]`.
///
/// Invalidation matches on prefixes: invalidating `["transactions"]` marks
/// every user's list stale.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long fetched data counts as fresh.
    pub stale_time: Duration,
    /// How long data survives without being refreshed.
    pub gc_time: Duration,
    /// Extra attempts after a failed fetch.
    pub retry: u32,
    /// Delay before the first retry; doubled on every further attempt.
    pub retry_delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(5 * 60),
            gc_time: Duration::from_secs(24 * 60 * 60),
            retry: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl QueryOptions {
    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_RETRY_DELAY)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryStatus {
    /// Nothing fetched yet.
    Pending,
    Success,
    /// The last fetch failed; `data` may still hold older results.
    Error,
}

/// Snapshot of one cache entry, as seen by a screen.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub status: QueryStatus,
    pub error: Option<String>,
    pub is_fetching: bool,
    pub is_stale: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> QueryState<T> {
    /// First load in progress: no data and no error yet.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Pending && self.data.is_none()
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }
}

impl<T> QueryState<Vec<T>> {
    /// Successfully loaded and nothing to show.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(&self.data, Some(items) if items.is_empty())
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            status: QueryStatus::Pending,
            error: None,
            is_fetching: false,
            is_stale: true,
            updated_at: None,
        }
    }
}

#[derive(Debug, Default)]
struct Entry {
    data: Option<serde_json::Value>,
    updated_at: Option<DateTime<Utc>>,
    error: Option<String>,
    invalidated: bool,
    fetching: bool,
    /// Bumped whenever a fetch completes.
    generation: u64,
    /// Bumped on every invalidation.
    invalidations: u64,
}

impl Entry {
    fn is_stale(&self, stale_time: Duration) -> bool {
        match self.updated_at {
            Some(at) => self.invalidated || age(at) >= stale_time,
            None => true,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    entry: Mutex<Entry>,
    fetch_lock: tokio::sync::Mutex<()>,
}

impl Slot {
    fn entry(&self) -> std::sync::MutexGuard<'_, Entry> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Process-wide query cache.
///
/// Build one at startup, wrap it in an `Arc` and hand it to whoever needs
/// it; there is no global instance.
pub struct QueryCache {
    slots: Mutex<HashMap<QueryKey, Arc<Slot>>>,
    options: QueryOptions,
    persister: Option<Persister>,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("options", &self.options)
            .field("persisted", &self.persister.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(QueryOptions::default())
    }
}

impl QueryCache {
    pub fn new(options: QueryOptions) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            options,
            persister: None,
        }
    }

    pub fn with_persister(options: QueryOptions, persister: Persister) -> Self {
        Self {
            persister: Some(persister),
            ..Self::new(options)
        }
    }

    #[must_use]
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Returns cached data when fresh, otherwise fetches it.
    ///
    /// Fetch failures end up in the returned state. The only error is
    /// [`ClientError::Cancelled`], which leaves the entry untouched.
    pub async fn query<T, F, Fut>(
        &self,
        key: &QueryKey,
        cancel: &CancellationToken,
        fetcher: F,
    ) -> Result<QueryState<T>, ClientError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let slot = self.slot(key);
        {
            let entry = slot.entry();
            if entry.data.is_some() && !entry.is_stale(self.options.stale_time) {
                return Ok(self.state_of(key, &entry));
            }
        }
        self.fetch(key, &slot, cancel, fetcher).await
    }

    /// Revalidates `key` regardless of freshness.
    ///
    /// A refresh that starts while another fetch of the same key is in
    /// flight waits for it and returns its result instead of issuing a
    /// second request.
    pub async fn refresh<T, F, Fut>(
        &self,
        key: &QueryKey,
        cancel: &CancellationToken,
        fetcher: F,
    ) -> Result<QueryState<T>, ClientError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let slot = self.slot(key);
        self.fetch(key, &slot, cancel, fetcher).await
    }

    /// Current state of `key` without fetching.
    pub fn peek<T: DeserializeOwned>(&self, key: &QueryKey) -> QueryState<T> {
        let slot = self.existing_slot(key);
        match slot {
            Some(slot) => self.state_of(key, &slot.entry()),
            None => QueryState::default(),
        }
    }

    pub fn get_query_data<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        self.peek(key).data
    }

    /// Replaces the data of `key` as if it had just been fetched.
    pub async fn set_query_data<T: Serialize>(
        &self,
        key: &QueryKey,
        data: &T,
    ) -> Result<(), ClientError> {
        let value = serde_json::to_value(data)?;
        {
            let slot = self.slot(key);
            let mut entry = slot.entry();
            entry.data = Some(value);
            entry.updated_at = Some(Utc::now());
            entry.error = None;
            entry.invalidated = false;
            entry.generation += 1;
        }
        self.persist().await;
        Ok(())
    }

    /// Marks every entry under `prefix` stale so the next read refetches.
    ///
    /// Returns how many entries were invalidated.
    pub async fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut count = 0;
        {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            for slot in slots
                .iter()
                .filter_map(|(key, slot)| key.starts_with(prefix).then_some(slot))
            {
                let mut entry = slot.entry();
                entry.invalidated = true;
                entry.invalidations += 1;
                count += 1;
            }
        }
        tracing::debug!(%prefix, count, "invalidated queries");
        if count > 0 {
            self.persist().await;
        }
        count
    }

    /// Drops entries that have not been refreshed within `gc_time`.
    ///
    /// Entries with a fetch in flight are kept.
    pub fn collect_garbage(&self) -> usize {
        let gc_time = self.options.gc_time;
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let before = slots.len();
        slots.retain(|_, slot| {
            let entry = slot.entry();
            entry.fetching || entry.updated_at.is_none_or(|at| age(at) < gc_time)
        });
        before - slots.len()
    }

    /// Loads the persisted snapshot, if any. Returns how many entries were
    /// restored.
    pub async fn restore(&self) -> Result<usize, ClientError> {
        let Some(persister) = &self.persister else {
            return Ok(0);
        };
        let Some(cache) = persister.load().await? else {
            return Ok(0);
        };

        let mut restored = 0;
        for query in cache.queries {
            if age(query.updated_at) >= self.options.gc_time {
                continue;
            }
            let slot = self.slot(&query.key);
            let mut entry = slot.entry();
            if entry.updated_at.is_some_and(|at| at >= query.updated_at) {
                continue;
            }
            entry.data = Some(query.data);
            entry.updated_at = Some(query.updated_at);
            entry.invalidated = query.invalidated;
            entry.error = None;
            restored += 1;
        }
        tracing::info!(restored, "restored query cache");
        Ok(restored)
    }

    /// Writes the current state to storage. Failures are logged.
    pub async fn persist(&self) {
        let Some(persister) = &self.persister else {
            return;
        };
        if let Err(err) = persister.save(|| self.dehydrate()).await {
            tracing::error!("failed to persist query cache: {err}");
        }
    }

    fn dehydrate(&self) -> Vec<PersistedQuery> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let mut queries: Vec<PersistedQuery> = slots
            .iter()
            .filter_map(|(key, slot)| {
                let entry = slot.entry();
                Some(PersistedQuery {
                    key: key.clone(),
                    data: entry.data.clone()?,
                    updated_at: entry.updated_at?,
                    invalidated: entry.invalidated,
                })
            })
            .collect();
        queries.sort_by(|a, b| a.key.cmp(&b.key));
        queries
    }

    fn slot(&self, key: &QueryKey) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(key.clone()).or_default().clone()
    }

    fn existing_slot(&self, key: &QueryKey) -> Option<Arc<Slot>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).cloned()
    }

    fn state_of<T: DeserializeOwned>(&self, key: &QueryKey, entry: &Entry) -> QueryState<T> {
        let data = entry.data.as_ref().and_then(|value| {
            T::deserialize(value)
                .inspect_err(|err| tracing::warn!(%key, "cached data has unexpected shape: {err}"))
                .ok()
        });
        let status = if entry.error.is_some() {
            QueryStatus::Error
        } else if data.is_some() {
            QueryStatus::Success
        } else {
            QueryStatus::Pending
        };

        QueryState {
            data,
            status,
            error: entry.error.clone(),
            is_fetching: entry.fetching,
            is_stale: entry.is_stale(self.options.stale_time),
            updated_at: entry.updated_at,
        }
    }

    async fn fetch<T, F, Fut>(
        &self,
        key: &QueryKey,
        slot: &Slot,
        cancel: &CancellationToken,
        fetcher: F,
    ) -> Result<QueryState<T>, ClientError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let seen = slot.entry().generation;

        let _guard = tokio::select! {
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            guard = slot.fetch_lock.lock() => guard,
        };

        let invalidations = {
            let mut entry = slot.entry();
            // A fetch that finished while we waited only counts if nothing
            // invalidated the key since it started.
            if entry.generation != seen && !entry.invalidated {
                tracing::debug!(%key, "joined in-flight fetch");
                return Ok(self.state_of(key, &entry));
            }
            entry.fetching = true;
            entry.invalidations
        };

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                slot.entry().fetching = false;
                tracing::debug!(%key, "fetch cancelled");
                return Err(ClientError::Cancelled);
            }
            result = self.fetch_with_retry(key, &fetcher) => result,
        };

        let result = result.and_then(|data| Ok(serde_json::to_value(&data)?));

        let state = {
            let mut entry = slot.entry();
            entry.fetching = false;
            entry.generation += 1;
            match result {
                Ok(value) => {
                    entry.data = Some(value);
                    entry.updated_at = Some(Utc::now());
                    entry.error = None;
                    // An invalidation that raced with this fetch still wins.
                    if entry.invalidations == invalidations {
                        entry.invalidated = false;
                    }
                }
                Err(err) => {
                    tracing::warn!(%key, "query failed: {err}");
                    entry.error = Some(err.to_string());
                }
            }
            self.state_of(key, &entry)
        };

        self.persist().await;
        Ok(state)
    }

    async fn fetch_with_retry<T, F, Fut>(&self, key: &QueryKey, fetcher: &F) -> Result<T, ClientError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt = 0;
        loop {
            match fetcher().await {
                Ok(data) => return Ok(data),
                Err(err) if attempt < self.options.retry && err.is_retryable() => {
                    let delay = self.options.backoff(attempt);
                    tracing::debug!(%key, attempt, ?delay, "retrying query: {err}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
