//! Retrying catalog loads with a short-lived cache.
//!
//! `fetch_with_retry` runs one fetch to completion under a `LoadPolicy`.
//! `ResourceLoader` runs those fetches as background tasks keyed by the
//! resource they load, and decides on arrival whether a result still matters.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use quiz_core::model::QuizSettings;
use storage::repository::StorageError;
use tokio::task::AbortHandle;
use tokio::time::{Instant, sleep};

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// Retry and cache parameters for one kind of load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub empty_recheck_delay: Duration,
    pub cache_ttl: Duration,
}

impl From<&QuizSettings> for LoadPolicy {
    fn from(settings: &QuizSettings) -> Self {
        Self {
            max_attempts: settings.load_attempts(),
            retry_delay: settings.retry_delay(),
            empty_recheck_delay: settings.empty_recheck_delay(),
            cache_ttl: settings.cache_ttl(),
        }
    }
}

impl Default for LoadPolicy {
    fn default() -> Self {
        Self::from(&QuizSettings::default())
    }
}

//
// ─── SINGLE FETCH ──────────────────────────────────────────────────────────────
//

/// Final result of a retried fetch.
#[derive(Debug)]
pub enum LoadOutcome<T> {
    Success(Vec<T>),
    /// The list was empty twice in a row.
    SuccessEmpty,
    Failure { attempts: u32, error: StorageError },
}

impl<T> LoadOutcome<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Calls `fetch` until it yields items, reports empty twice, or fails
/// `policy.max_attempts` times.
///
/// An empty list is re-checked once after `empty_recheck_delay` since the
/// backing store can answer before it is populated. Failures are retried with
/// a fixed `retry_delay` between attempts.
pub async fn fetch_with_retry<T, F, Fut>(policy: LoadPolicy, fetch: F) -> LoadOutcome<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Vec<T>, StorageError>>,
{
    let mut failures = 0_u32;
    let mut rechecked_empty = false;

    loop {
        let attempt = fetch();
        match attempt.await {
            Ok(items) if !items.is_empty() => return LoadOutcome::Success(items),
            Ok(_) if !rechecked_empty => {
                rechecked_empty = true;
                log::debug!(
                    "fetch returned nothing, re-checking in {:?}",
                    policy.empty_recheck_delay
                );
                sleep(policy.empty_recheck_delay).await;
            }
            Ok(_) => return LoadOutcome::SuccessEmpty,
            Err(error) => {
                failures += 1;
                if failures >= policy.max_attempts {
                    return LoadOutcome::Failure {
                        attempts: failures,
                        error,
                    };
                }
                log::warn!(
                    "fetch attempt {failures}/{} failed: {error}; retrying in {:?}",
                    policy.max_attempts,
                    policy.retry_delay
                );
                sleep(policy.retry_delay).await;
            }
        }
    }
}

//
// ─── KEYED LOADER ──────────────────────────────────────────────────────────────
//

/// How `ResourceLoader::load` treats cached and in-flight work for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Serve a fresh cache entry or join an in-flight fetch.
    Reuse,
    /// Abort any in-flight fetch, drop the cache entry and start over.
    Force,
}

/// What `ResourceLoader::load` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStart<T> {
    /// Served from cache; nothing will be delivered.
    Cached(Vec<T>),
    Started,
    AlreadyInFlight,
}

/// Identifies one spawned fetch. Handed to `deliver` with its outcome and
/// passed back to [`ResourceLoader::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

struct InFlight {
    ticket: LoadTicket,
    handle: AbortHandle,
    responses: Arc<AtomicU32>,
}

struct CacheEntry<T> {
    items: Vec<T>,
    fetched_at: Instant,
}

/// Background loader for one kind of list, keyed by its owner.
///
/// Only the most recently requested key is *active*. Results for any other
/// key are still cached when successful but are withheld from the caller.
pub struct ResourceLoader<K, T> {
    policy: LoadPolicy,
    active: Option<K>,
    in_flight: HashMap<K, InFlight>,
    cache: HashMap<K, CacheEntry<T>>,
    next_ticket: u64,
}

impl<K, T> ResourceLoader<K, T>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
    T: Clone + Send + 'static,
{
    #[must_use]
    pub fn new(policy: LoadPolicy) -> Self {
        Self {
            policy,
            active: None,
            in_flight: HashMap::new(),
            cache: HashMap::new(),
            next_ticket: 0,
        }
    }

    #[must_use]
    pub fn policy(&self) -> LoadPolicy {
        self.policy
    }

    #[must_use]
    pub fn active(&self) -> Option<&K> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn is_active(&self, key: &K) -> bool {
        self.active.as_ref() == Some(key)
    }

    /// No key is active afterwards; pending fetches keep running.
    pub fn deactivate(&mut self) {
        self.active = None;
    }

    #[must_use]
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.in_flight.contains_key(key)
    }

    #[must_use]
    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// True while the active key's fetch has not reported back.
    ///
    /// Fetches for superseded keys are not counted: one of them may never
    /// finish.
    #[must_use]
    pub fn has_active_in_flight(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|key| self.in_flight.contains_key(key))
    }

    /// True while the fetch for `key` is waiting on its very first response.
    #[must_use]
    pub fn is_stalled(&self, key: &K) -> bool {
        self.in_flight
            .get(key)
            .is_some_and(|task| task.responses.load(Ordering::Relaxed) == 0)
    }

    pub fn invalidate(&mut self, key: &K) {
        self.cache.remove(key);
    }

    /// Makes `key` active and makes sure its items are on their way.
    ///
    /// When a fetch is spawned, its ticket and outcome are handed to `deliver`
    /// from the background task. The caller routes both back through
    /// [`Self::resolve`].
    pub fn load<F, Fut, D>(&mut self, key: K, mode: LoadMode, fetch: F, deliver: D) -> LoadStart<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, StorageError>> + Send + 'static,
        D: FnOnce(LoadTicket, LoadOutcome<T>) + Send + 'static,
    {
        self.active = Some(key.clone());

        match mode {
            LoadMode::Reuse => {
                if let Some(items) = self.fresh(&key) {
                    log::debug!("serving {key:?} from cache");
                    return LoadStart::Cached(items);
                }
                if self.in_flight.contains_key(&key) {
                    return LoadStart::AlreadyInFlight;
                }
            }
            LoadMode::Force => {
                if let Some(task) = self.in_flight.remove(&key) {
                    task.handle.abort();
                }
                self.cache.remove(&key);
            }
        }

        self.spawn(key, fetch, deliver);
        LoadStart::Started
    }

    /// Accepts a delivered outcome.
    ///
    /// Returns `None` when the result is stale: either `key` is no longer
    /// active or `ticket` is not the fetch pending for it (a forced refetch
    /// replaced it, or nothing was pending).
    pub fn resolve(
        &mut self,
        key: &K,
        ticket: LoadTicket,
        outcome: LoadOutcome<T>,
    ) -> Option<LoadOutcome<T>> {
        let pending = self
            .in_flight
            .get(key)
            .is_some_and(|task| task.ticket == ticket);
        if !pending {
            log::debug!("dropping unsolicited result for {key:?}");
            return None;
        }
        self.in_flight.remove(key);

        self.prune_expired();
        if let LoadOutcome::Success(items) = &outcome {
            self.cache.insert(
                key.clone(),
                CacheEntry {
                    items: items.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }

        if !self.is_active(key) {
            log::debug!("discarding stale result for {key:?}");
            return None;
        }
        Some(outcome)
    }

    fn prune_expired(&mut self) {
        let ttl = self.policy.cache_ttl;
        self.cache.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
    }

    fn fresh(&mut self, key: &K) -> Option<Vec<T>> {
        let ttl = self.policy.cache_ttl;
        let expired = self.cache.get(key).map(|entry| entry.fetched_at.elapsed() >= ttl)?;
        if expired {
            self.cache.remove(key);
            return None;
        }
        self.cache.get(key).map(|entry| entry.items.clone())
    }

    fn spawn<F, Fut, D>(&mut self, key: K, fetch: F, deliver: D)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, StorageError>> + Send + 'static,
        D: FnOnce(LoadTicket, LoadOutcome<T>) + Send + 'static,
    {
        let policy = self.policy;
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        let responses = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&responses);

        let handle = tokio::spawn(async move {
            let counted = || {
                let attempt = fetch();
                let counter = Arc::clone(&counter);
                async move {
                    let result = attempt.await;
                    counter.fetch_add(1, Ordering::Relaxed);
                    result
                }
            };
            deliver(ticket, fetch_with_retry(policy, counted).await);
        });

        self.in_flight.insert(
            key,
            InFlight {
                ticket,
                handle: handle.abort_handle(),
                responses,
            },
        );
    }
}

impl<K, T> Drop for ResourceLoader<K, T> {
    fn drop(&mut self) {
        for task in self.in_flight.values() {
            task.handle.abort();
        }
    }
}
