//! Cache-aware reads and invalidating writes on top of `RecipeApi`.
//!
//! # Design
//! Reads are keyed by `QueryKey` and served from the injected `QueryCache`
//! while fresh. Writes always hit the network exactly once; on success they
//! invalidate every list query (and the touched detail query) instead of
//! patching cached data, so the next read reflects the backend. Every write
//! outcome is reported through the `Notifier`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::RecipeApi;
use crate::cache::{CachedData, QueryCache, QueryGroup, QueryKey, QueryState};
use crate::error::ApiError;
use crate::notify::{MutationKind, Notification, Notifier};
use crate::transport::Transport;
use crate::types::{Recipe, RecipeCreate, RecipeFilters, RecipeId, RecipeUpdate};

/// Reads are never retried; a failed fetch surfaces on the first error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    #[default]
    Never,
}

/// Per-operation read configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub key: QueryKey,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl QueryOptions {
    /// Recipe reads surface failures immediately.
    pub fn read(key: QueryKey, timeout: Duration) -> Self {
        Self {
            key,
            timeout,
            retry: RetryPolicy::Never,
        }
    }
}

/// Lifecycle of one kind of write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed(ApiError),
}

impl MutationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, MutationStatus::Pending)
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, MutationStatus::Succeeded | MutationStatus::Failed(_))
    }
}

#[derive(Default)]
struct Mutations {
    status: Mutex<HashMap<MutationKind, watch::Sender<MutationStatus>>>,
}

impl Mutations {
    fn lock(&self) -> MutexGuard<'_, HashMap<MutationKind, watch::Sender<MutationStatus>>> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set(&self, kind: MutationKind, status: MutationStatus) {
        self.lock()
            .entry(kind)
            .or_insert_with(|| watch::channel(MutationStatus::Idle).0)
            .send_replace(status);
    }

    fn get(&self, kind: MutationKind) -> MutationStatus {
        self.lock()
            .get(&kind)
            .map(|tx| tx.borrow().clone())
            .unwrap_or_default()
    }

    fn subscribe(&self, kind: MutationKind) -> watch::Receiver<MutationStatus> {
        self.lock()
            .entry(kind)
            .or_insert_with(|| watch::channel(MutationStatus::Idle).0)
            .subscribe()
    }
}

pub struct QueryClient<T> {
    api: RecipeApi<T>,
    cache: QueryCache,
    notifier: Arc<dyn Notifier>,
    mutations: Arc<Mutations>,
}

impl<T> Clone for QueryClient<T> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            cache: self.cache.clone(),
            notifier: Arc::clone(&self.notifier),
            mutations: Arc::clone(&self.mutations),
        }
    }
}

impl<T: Transport> QueryClient<T> {
    pub fn new(api: RecipeApi<T>, cache: QueryCache, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            cache,
            notifier,
            mutations: Arc::new(Mutations::default()),
        }
    }

    pub fn api(&self) -> &RecipeApi<T> {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// List recipes matching `filters`, from cache while fresh.
    pub async fn recipes(&self, filters: &RecipeFilters) -> Result<Vec<Recipe>, ApiError> {
        self.read_recipes(filters, false).await
    }

    /// List recipes, ignoring any cached result. Backs a manual retry.
    pub async fn refetch_recipes(&self, filters: &RecipeFilters) -> Result<Vec<Recipe>, ApiError> {
        self.read_recipes(filters, true).await
    }

    async fn read_recipes(
        &self,
        filters: &RecipeFilters,
        force: bool,
    ) -> Result<Vec<Recipe>, ApiError> {
        let options = self.read_options(QueryKey::Recipes(filters.clone()));
        let api = self.api.with_timeout(options.timeout);
        let api = &api;
        let data = self
            .run_query(&options, force, || async move {
                api.list_recipes(filters).await.map(CachedData::Recipes)
            })
            .await?;
        match data {
            CachedData::Recipes(recipes) => Ok(recipes),
            CachedData::Recipe(_) => Err(mismatch(&options.key)),
        }
    }

    /// Fetch one recipe. Ids below 1 never reach the network and yield
    /// `None`.
    pub async fn recipe(&self, id: RecipeId) -> Result<Option<Recipe>, ApiError> {
        if id <= 0 {
            return Ok(None);
        }
        let options = self.read_options(QueryKey::Recipe(id));
        let api = self.api.with_timeout(options.timeout);
        let api = &api;
        let data = self
            .run_query(&options, false, || async move {
                api.get_recipe(id).await.map(CachedData::Recipe)
            })
            .await?;
        match data {
            CachedData::Recipe(recipe) => Ok(Some(recipe)),
            CachedData::Recipes(_) => Err(mismatch(&options.key)),
        }
    }

    pub fn recipes_state(&self, filters: &RecipeFilters) -> QueryState<Vec<Recipe>> {
        match self.cache.state(&QueryKey::Recipes(filters.clone())) {
            QueryState::Success(CachedData::Recipes(recipes)) => QueryState::Success(recipes),
            QueryState::Success(CachedData::Recipe(_)) => QueryState::Idle,
            other => other.map(|_| Vec::new()),
        }
    }

    pub fn recipe_state(&self, id: RecipeId) -> QueryState<Recipe> {
        match self.cache.state(&QueryKey::Recipe(id)) {
            QueryState::Success(CachedData::Recipe(recipe)) => QueryState::Success(recipe),
            QueryState::Success(CachedData::Recipes(_)) | QueryState::Idle => QueryState::Idle,
            QueryState::Loading => QueryState::Loading,
            QueryState::Error(err) => QueryState::Error(err),
        }
    }

    fn read_options(&self, key: QueryKey) -> QueryOptions {
        QueryOptions::read(key, self.api.timeout())
    }

    async fn run_query<F, Fut>(
        &self,
        options: &QueryOptions,
        force: bool,
        fetch: F,
    ) -> Result<CachedData, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedData, ApiError>>,
    {
        let key = &options.key;
        if !force {
            if let Some(data) = self.cache.fresh(key) {
                debug!(?key, "serving cached query");
                return Ok(data);
            }
        }

        let started = self.cache.set_loading(key);
        debug!(?key, retry = ?options.retry, "fetching query");
        let result = fetch().await;

        match &result {
            Ok(data) => self.cache.set_success(key, data.clone(), started),
            Err(err) => {
                warn!(?key, error = %err, "query failed");
                self.cache.set_error(key, err.clone());
            }
        }
        result
    }

    pub async fn create_recipe(&self, payload: &RecipeCreate) -> Result<Recipe, ApiError> {
        self.run_mutation(MutationKind::Create, None, self.api.create_recipe(payload))
            .await
    }

    pub async fn update_recipe(
        &self,
        id: RecipeId,
        payload: &RecipeUpdate,
    ) -> Result<Recipe, ApiError> {
        self.run_mutation(
            MutationKind::Update,
            Some(id),
            self.api.update_recipe(id, payload),
        )
        .await
    }

    pub async fn delete_recipe(&self, id: RecipeId) -> Result<(), ApiError> {
        self.run_mutation(MutationKind::Delete, Some(id), self.api.delete_recipe(id))
            .await
    }

    async fn run_mutation<R>(
        &self,
        kind: MutationKind,
        touched: Option<RecipeId>,
        call: impl Future<Output = Result<R, ApiError>>,
    ) -> Result<R, ApiError> {
        self.mutations.set(kind, MutationStatus::Pending);
        let result = call.await;
        match &result {
            Ok(_) => {
                self.cache.invalidate_group(QueryGroup::Recipes);
                if let Some(id) = touched {
                    self.cache.invalidate(&QueryKey::Recipe(id));
                }
                self.mutations.set(kind, MutationStatus::Succeeded);
                self.notifier.notify(Notification::succeeded(kind));
            }
            Err(err) => {
                warn!(action = kind.verb(), error = %err, "mutation failed");
                self.mutations.set(kind, MutationStatus::Failed(err.clone()));
                self.notifier.notify(Notification::failed(kind, err));
            }
        }
        result
    }

    pub fn mutation_status(&self, kind: MutationKind) -> MutationStatus {
        self.mutations.get(kind)
    }

    pub fn subscribe_mutation(&self, kind: MutationKind) -> watch::Receiver<MutationStatus> {
        self.mutations.subscribe(kind)
    }

    pub fn is_pending(&self, kind: MutationKind) -> bool {
        self.mutation_status(kind).is_pending()
    }

    /// The recipe form submits either a create or an update.
    pub fn form_busy(&self) -> bool {
        self.is_pending(MutationKind::Create) || self.is_pending(MutationKind::Update)
    }
}

fn mismatch(key: &QueryKey) -> ApiError {
    ApiError::Decode(format!("cached data does not match query {key:?}"))
}
