//! Session-scoped cache of read results.
//!
//! # Design
//! `QueryCache` is an explicit service: it is created once per session and
//! cloned into whatever needs it (clones share the same entries). Each entry
//! holds a `watch` channel carrying its `QueryState`, so storing a result and
//! notifying subscribers are the same operation. Invalidation marks an entry
//! stale and wakes its subscribers without touching the data; the next read
//! refetches.
//!
//! Every invalidation bumps the entry's `Generation`. A fetch records the
//! generation it started under, and a result that lands after an
//! invalidation is stored but stays stale.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::error::ApiError;
use crate::types::{Recipe, RecipeFilters, RecipeId};

/// Cache key: operation plus the exact parameters used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Recipes(RecipeFilters),
    Recipe(RecipeId),
}

/// Invalidation groups, named after the operation part of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryGroup {
    Recipes,
    Recipe,
}

impl QueryGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryGroup::Recipes => "recipes",
            QueryGroup::Recipe => "recipe",
        }
    }
}

impl QueryKey {
    pub fn group(&self) -> QueryGroup {
        match self {
            QueryKey::Recipes(_) => QueryGroup::Recipes,
            QueryKey::Recipe(_) => QueryGroup::Recipe,
        }
    }
}

/// Lifecycle of one read query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QueryState<T> {
    #[default]
    Idle,
    Loading,
    Success(T),
    Error(ApiError),
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            QueryState::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryState<U> {
        match self {
            QueryState::Idle => QueryState::Idle,
            QueryState::Loading => QueryState::Loading,
            QueryState::Success(data) => QueryState::Success(f(data)),
            QueryState::Error(err) => QueryState::Error(err),
        }
    }
}

/// Payload of a successful read, tagged by operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedData {
    Recipes(Vec<Recipe>),
    Recipe(Recipe),
}

/// Invalidation counter of one entry, as seen when a fetch started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Generation(u64);

struct Entry {
    state: watch::Sender<QueryState<CachedData>>,
    fetched_at: Option<Instant>,
    invalidated: bool,
    generation: Generation,
}

impl Entry {
    fn new() -> Self {
        let (state, _) = watch::channel(QueryState::Idle);
        Self {
            state,
            fetched_at: None,
            invalidated: false,
            generation: Generation::default(),
        }
    }
}

#[derive(Clone)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<QueryKey, Entry>>>,
    stale_time: Duration,
}

impl QueryCache {
    /// Successful results younger than `stale_time` are served without a
    /// network call.
    pub fn new(stale_time: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            stale_time,
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Data for `key` if it can be served without refetching.
    pub fn fresh(&self, key: &QueryKey) -> Option<CachedData> {
        let entries = self.lock();
        let entry = entries.get(key)?;
        if entry.invalidated {
            return None;
        }
        let fetched_at = entry.fetched_at?;
        if fetched_at.elapsed() >= self.stale_time {
            return None;
        }
        let data = entry.state.borrow().data().cloned();
        data
    }

    pub fn state(&self, key: &QueryKey) -> QueryState<CachedData> {
        self.lock()
            .get(key)
            .map(|entry| entry.state.borrow().clone())
            .unwrap_or_default()
    }

    /// Receiver observing every state change of `key`. Creates an idle entry
    /// when the key has never been read.
    pub fn subscribe(&self, key: &QueryKey) -> watch::Receiver<QueryState<CachedData>> {
        self.lock()
            .entry(key.clone())
            .or_insert_with(Entry::new)
            .state
            .subscribe()
    }

    /// Mark `key` as fetching. Pass the returned generation to
    /// `set_success` when the fetch completes.
    pub fn set_loading(&self, key: &QueryKey) -> Generation {
        let mut entries = self.lock();
        let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
        entry.state.send_replace(QueryState::Loading);
        entry.generation
    }

    /// Store a fetched result. It only becomes fresh when `key` was not
    /// invalidated since `started`; otherwise the next read refetches.
    pub fn set_success(&self, key: &QueryKey, data: CachedData, started: Generation) {
        let mut entries = self.lock();
        let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
        entry.fetched_at = Some(Instant::now());
        if entry.generation == started {
            entry.invalidated = false;
        } else {
            debug!(?key, "result predates invalidation, kept stale");
        }
        entry.state.send_replace(QueryState::Success(data));
    }

    pub fn set_error(&self, key: &QueryKey, error: ApiError) {
        let mut entries = self.lock();
        let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
        entry.fetched_at = None;
        entry.state.send_replace(QueryState::Error(error));
    }

    pub fn is_invalidated(&self, key: &QueryKey) -> bool {
        self.lock().get(key).is_some_and(|entry| entry.invalidated)
    }

    /// Mark one entry stale. Returns whether the entry existed.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let mut entries = self.lock();
        match entries.get_mut(key) {
            Some(entry) => {
                mark_invalid(entry);
                true
            }
            None => false,
        }
    }

    /// Mark every entry of `group` stale. Returns how many were marked.
    pub fn invalidate_group(&self, group: QueryGroup) -> usize {
        let mut entries = self.lock();
        let mut count = 0;
        for (_, entry) in entries.iter_mut().filter(|(key, _)| key.group() == group) {
            mark_invalid(entry);
            count += 1;
        }
        debug!(group = group.as_str(), count, "invalidated cached queries");
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.lock().contains_key(key)
    }
}

fn mark_invalid(entry: &mut Entry) {
    entry.invalidated = true;
    entry.generation.0 += 1;
    // Wake subscribers so active views know to refetch.
    entry.state.send_modify(|_| {});
}
