//! Keyed query cache with request deduplication and polling.
//!
//! A [`ResourceCache`] holds one entry per [`QueryKey`]. Every subscriber to
//! the same key shares the entry: at most one fetch is issued for concurrent
//! subscribers, results are broadcast to all of them, and a refresh timer
//! re-fetches while anyone is still subscribed.
//!
//! Completions are ordered by issue sequence. A result that arrives after a
//! newer one has already been applied is dropped, as is any result for an
//! entry that was released in the meantime.
//!
//! Entries without subscribers are kept for a short grace period so a quick
//! re-subscription reuses the cached value instead of fetching again.

mod key;
mod state;

pub use key::QueryKey;
pub use state::{QueryState, QueryStatus};

use chrono::Utc;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

/// Default time an entry without subscribers is kept before release.
pub const DEFAULT_RELEASE_GRACE: Duration = Duration::from_secs(5);

type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;
type Fetcher<T, E> = Arc<dyn Fn() -> BoxFuture<T, E> + Send + Sync>;

/// Per-subscription fetch behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Re-fetch interval while subscribed. `Duration::ZERO` disables polling.
    pub refresh_interval: Duration,
    /// Whether the query may fetch at all.
    pub enabled: bool,
}

impl QueryOptions {
    /// Options for a query fetched once, without polling.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a query re-fetched every `interval`.
    #[must_use]
    pub fn polling(interval: Duration) -> Self {
        Self {
            refresh_interval: interval,
            enabled: true,
        }
    }

    /// Enables or disables fetching.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Combines the options of two subscribers to the same entry.
    ///
    /// The entry is enabled if either subscriber wants it, and polls at the
    /// shortest non-zero interval requested.
    fn merge(self, other: Self) -> Self {
        let refresh_interval = match (self.refresh_interval, other.refresh_interval) {
            (a, b) if a.is_zero() => b,
            (a, b) if b.is_zero() => a,
            (a, b) => a.min(b),
        };
        Self {
            refresh_interval,
            enabled: self.enabled || other.enabled,
        }
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::ZERO,
            enabled: true,
        }
    }
}

struct Entry<T, E> {
    generation: u64,
    fetcher: Fetcher<T, E>,
    options: QueryOptions,
    state: watch::Sender<QueryState<T, E>>,
    subscribers: usize,
    issued_seq: u64,
    applied_seq: u64,
    outstanding: usize,
    refresh_timer: Option<JoinHandle<()>>,
    release_timer: Option<JoinHandle<()>>,
}

impl<T, E> Entry<T, E> {
    fn cancel_refresh(&mut self) {
        if let Some(timer) = self.refresh_timer.take() {
            timer.abort();
        }
    }

    fn cancel_release(&mut self) {
        if let Some(timer) = self.release_timer.take() {
            timer.abort();
        }
    }
}

struct Inner<T, E> {
    entries: Mutex<HashMap<QueryKey, Entry<T, E>>>,
    release_grace: Duration,
    next_generation: AtomicU64,
}

/// Shared cache of asynchronous query results.
///
/// Cloning is cheap; clones share the same entries.
///
/// Subscribing, refetching and dropping subscriptions spawn timers and fetch
/// tasks, so they must happen inside a Tokio runtime.
///
/// # Example
///
/// ```
/// use client::cache::{QueryKey, QueryOptions, ResourceCache};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache: ResourceCache<u32, String> = ResourceCache::new();
/// let mut sub = cache.subscribe(QueryKey::new("answer"), QueryOptions::new(), || async {
///     Ok(42)
/// });
///
/// let state = sub.settled().await.unwrap();
/// assert_eq!(state.data.as_deref(), Some(&42));
/// # }
/// ```
pub struct ResourceCache<T, E> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for ResourceCache<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> Default for ResourceCache<T, E>
where
    T: Send + Sync + 'static,
    E: Display + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> std::fmt::Debug for ResourceCache<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("entries", &self.inner.lock().len())
            .field("release_grace", &self.inner.release_grace)
            .finish()
    }
}

impl<T, E> ResourceCache<T, E>
where
    T: Send + Sync + 'static,
    E: Display + Send + Sync + 'static,
{
    /// Creates an empty cache with the default release grace period.
    #[must_use]
    pub fn new() -> Self {
        Self::with_release_grace(DEFAULT_RELEASE_GRACE)
    }

    /// Creates an empty cache that keeps unused entries for `grace`.
    ///
    /// A zero grace releases entries as soon as their last subscriber leaves.
    #[must_use]
    pub fn with_release_grace(grace: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                release_grace: grace,
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// Subscribes to `key`, creating the entry with `fetcher` if needed.
    ///
    /// The first subscriber's fetcher is used for the lifetime of the entry;
    /// later subscribers only contribute their options.
    ///
    /// A fetch is started when the entry is new, was disabled until now, or
    /// holds no successful result and nothing is in flight.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn subscribe<F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> Subscription<T, E>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let mut entries = self.inner.lock();

        let (generation, receiver) = if let Some(entry) = entries.get_mut(&key) {
            entry.subscribers += 1;
            entry.cancel_release();

            let was_enabled = entry.options.enabled;
            entry.options = entry.options.merge(options);

            let status = entry.state.borrow().status;
            let needs_fetch = entry.options.enabled
                && entry.outstanding == 0
                && (!was_enabled || matches!(status, QueryStatus::Idle | QueryStatus::Error));

            if needs_fetch {
                self.inner.start_fetch(&key, entry);
            } else if entry.outstanding == 0 {
                self.inner.arm_refresh(&key, entry);
            }
            tracing::debug!(key = %key, subscribers = entry.subscribers, "Joined query");

            (entry.generation, entry.state.subscribe())
        } else {
            let fetcher: Fetcher<T, E> = Arc::new(move || Box::pin(fetcher()) as BoxFuture<T, E>);
            let (state, receiver) = watch::channel(QueryState::idle());
            let mut entry = Entry {
                generation: self.inner.next_generation.fetch_add(1, Ordering::Relaxed),
                fetcher,
                options,
                state,
                subscribers: 1,
                issued_seq: 0,
                applied_seq: 0,
                outstanding: 0,
                refresh_timer: None,
                release_timer: None,
            };
            if options.enabled {
                self.inner.start_fetch(&key, &mut entry);
            }
            tracing::debug!(key = %key, enabled = options.enabled, "Created query");

            let generation = entry.generation;
            entries.insert(key.clone(), entry);
            (generation, receiver)
        };

        Subscription {
            key,
            generation,
            receiver,
            cache: Arc::downgrade(&self.inner),
        }
    }

    /// Re-fetches `key` unless a fetch is already in flight.
    ///
    /// Returns false if the key has no entry.
    pub fn refetch(&self, key: &QueryKey) -> bool {
        self.inner.refetch(key)
    }

    /// Issues a new fetch for `key` even if one is already in flight.
    ///
    /// Whichever of the two results was issued last wins, regardless of
    /// arrival order. Returns false if the key has no entry.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let mut entries = self.inner.lock();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        if entry.options.enabled {
            entry.cancel_refresh();
            self.inner.start_fetch(key, entry);
        }
        true
    }

    /// Returns a snapshot of the entry for `key`, if any.
    #[must_use]
    pub fn state(&self, key: &QueryKey) -> Option<QueryState<T, E>> {
        self.inner
            .lock()
            .get(key)
            .map(|entry| entry.state.borrow().clone())
    }

    /// Returns the number of live subscriptions to `key`.
    #[must_use]
    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.inner.lock().get(key).map_or(0, |entry| entry.subscribers)
    }

    /// Returns true if the cache holds an entry for `key`.
    #[must_use]
    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner.lock().contains_key(key)
    }

    /// Returns the keys of every entry, including those awaiting release.
    #[must_use]
    pub fn keys(&self) -> Vec<QueryKey> {
        self.inner.lock().keys().cloned().collect()
    }

    /// Returns the number of entries, including those awaiting release.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl<T, E> Inner<T, E> {
    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry<T, E>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, E> Inner<T, E>
where
    T: Send + Sync + 'static,
    E: Display + Send + Sync + 'static,
{
    fn start_fetch(self: &Arc<Self>, key: &QueryKey, entry: &mut Entry<T, E>) {
        entry.issued_seq += 1;
        entry.outstanding += 1;
        let seq = entry.issued_seq;
        let generation = entry.generation;

        entry.state.send_modify(|state| {
            if state.status == QueryStatus::Idle {
                state.status = QueryStatus::Loading;
            }
            state.is_refreshing = true;
        });
        tracing::debug!(key = %key, seq, "Fetching query");

        // Created under the lock so call order matches issue order.
        let fetch = tokio::spawn((entry.fetcher)());
        let cache = Arc::downgrade(self);
        let key = key.clone();
        tokio::spawn(async move {
            let joined = fetch.await;
            let Some(cache) = cache.upgrade() else {
                return;
            };
            match joined {
                Ok(result) => cache.complete(&key, generation, seq, result),
                Err(error) => cache.abandon(&key, generation, seq, &error),
            }
        });
    }

    /// Accounts for a fetch that panicked or was cancelled without a result.
    ///
    /// The entry keeps its data and error; a first fetch that never produced
    /// anything settles as `Error` so waiters are not left in `Loading`.
    fn abandon(self: &Arc<Self>, key: &QueryKey, generation: u64, seq: u64, error: &JoinError) {
        let mut entries = self.lock();
        let Some(entry) = entries
            .get_mut(key)
            .filter(|entry| entry.generation == generation)
        else {
            return;
        };

        entry.outstanding = entry.outstanding.saturating_sub(1);
        let refreshing = entry.outstanding > 0;
        tracing::warn!(key = %key, seq, error = %error, "Query fetch did not complete");

        entry.state.send_modify(|state| {
            if state.status == QueryStatus::Loading && !refreshing {
                state.status = QueryStatus::Error;
            }
            state.is_refreshing = refreshing;
        });

        if !refreshing && entry.subscribers > 0 {
            self.arm_refresh(key, entry);
        }
    }

    fn complete(self: &Arc<Self>, key: &QueryKey, generation: u64, seq: u64, result: Result<T, E>) {
        let mut entries = self.lock();
        let Some(entry) = entries
            .get_mut(key)
            .filter(|entry| entry.generation == generation)
        else {
            tracing::debug!(key = %key, seq, "Dropping result for released query");
            return;
        };

        entry.outstanding = entry.outstanding.saturating_sub(1);
        let refreshing = entry.outstanding > 0;

        if seq <= entry.applied_seq {
            tracing::debug!(
                key = %key,
                seq,
                applied = entry.applied_seq,
                "Dropping out-of-order result"
            );
            entry.state.send_if_modified(|state| {
                let changed = state.is_refreshing != refreshing;
                state.is_refreshing = refreshing;
                changed
            });
        } else {
            entry.applied_seq = seq;
            let now = Utc::now();
            match result {
                Ok(data) => entry.state.send_modify(|state| {
                    state.data = Some(Arc::new(data));
                    state.status = QueryStatus::Success;
                    state.error = None;
                    state.is_refreshing = refreshing;
                    state.updated_at = Some(now);
                }),
                Err(error) => {
                    tracing::warn!(key = %key, error = %error, "Query failed, keeping previous data");
                    entry.state.send_modify(|state| {
                        state.status = QueryStatus::Error;
                        state.error = Some(Arc::new(error));
                        state.is_refreshing = refreshing;
                        state.updated_at = Some(now);
                    });
                }
            }
        }

        if !refreshing && entry.subscribers > 0 {
            self.arm_refresh(key, entry);
        }
    }

    fn arm_refresh(self: &Arc<Self>, key: &QueryKey, entry: &mut Entry<T, E>) {
        let interval = entry.options.refresh_interval;
        if !entry.options.enabled || interval.is_zero() || entry.refresh_timer.is_some() {
            return;
        }

        let cache = Arc::downgrade(self);
        let key = key.clone();
        let generation = entry.generation;
        entry.refresh_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            if let Some(cache) = cache.upgrade() {
                cache.on_refresh_due(&key, generation);
            }
        }));
    }

    fn on_refresh_due(self: &Arc<Self>, key: &QueryKey, generation: u64) {
        let mut entries = self.lock();
        let Some(entry) = entries
            .get_mut(key)
            .filter(|entry| entry.generation == generation)
        else {
            return;
        };

        // The timer task is finishing; detach rather than abort it.
        entry.refresh_timer = None;
        if entry.subscribers > 0 && entry.outstanding == 0 && entry.options.enabled {
            self.start_fetch(key, entry);
        }
    }

    fn refetch(self: &Arc<Self>, key: &QueryKey) -> bool {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        if entry.options.enabled && entry.outstanding == 0 {
            entry.cancel_refresh();
            self.start_fetch(key, entry);
        }
        true
    }
}

impl<T, E> Inner<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn unsubscribe(self: &Arc<Self>, key: &QueryKey, generation: u64) {
        let mut entries = self.lock();
        let Some(entry) = entries
            .get_mut(key)
            .filter(|entry| entry.generation == generation)
        else {
            return;
        };

        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers > 0 {
            return;
        }
        entry.cancel_refresh();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) if !self.release_grace.is_zero() => {
                let cache = Arc::downgrade(self);
                let grace = self.release_grace;
                let key = key.clone();
                entry.release_timer = Some(runtime.spawn(async move {
                    tokio::time::sleep(grace).await;
                    if let Some(cache) = cache.upgrade() {
                        cache.release(&key, generation);
                    }
                }));
            }
            _ => {
                entries.remove(key);
                tracing::debug!(key = %key, "Released query");
            }
        }
    }

    fn release(&self, key: &QueryKey, generation: u64) {
        let mut entries = self.lock();
        let idle = entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation && entry.subscribers == 0);
        if idle {
            entries.remove(key);
            tracing::debug!(key = %key, "Released query after grace period");
        }
    }
}

/// A live interest in one cache entry.
///
/// Dropping the subscription releases the interest; once the last one is
/// gone the entry stops polling and is released after the grace period.
pub struct Subscription<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    key: QueryKey,
    generation: u64,
    receiver: watch::Receiver<QueryState<T, E>>,
    cache: Weak<Inner<T, E>>,
}

impl<T, E> Subscription<T, E>
where
    T: Send + Sync + 'static,
    E: Display + Send + Sync + 'static,
{
    /// Returns the key this subscription is bound to.
    #[must_use]
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> QueryState<T, E> {
        self.receiver.borrow().clone()
    }

    /// Waits for the next state change and returns the new state.
    ///
    /// Returns `None` if the cache has been dropped.
    pub async fn changed(&mut self) -> Option<QueryState<T, E>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Waits until a fetch has completed and nothing is in flight.
    ///
    /// Returns immediately if the entry is already settled, and `None` if the
    /// cache has been dropped.
    pub async fn settled(&mut self) -> Option<QueryState<T, E>> {
        self.wait_for(QueryState::is_settled).await
    }

    /// Waits until the state satisfies `predicate`.
    ///
    /// Returns `None` if the cache has been dropped.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&QueryState<T, E>) -> bool,
    ) -> Option<QueryState<T, E>> {
        let state = self.receiver.wait_for(predicate).await.ok()?;
        Some(QueryState::clone(&state))
    }

    /// Re-fetches unless a fetch is already in flight.
    pub fn refetch(&self) {
        if let Some(cache) = self.cache.upgrade() {
            cache.refetch(&self.key);
        }
    }
}

impl<T, E> std::fmt::Debug for Subscription<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("status", &self.receiver.borrow().status)
            .finish_non_exhaustive()
    }
}

impl<T, E> Drop for Subscription<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(cache) = self.cache.upgrade() {
            cache.unsubscribe(&self.key, self.generation);
        }
    }
}
