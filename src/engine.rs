//! Top-level facade tying the registry, indexer, query engine, and cache
//! together behind a builder (see `spec.md` §10.1).

use std::sync::Arc;

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::facet::FacetExpression;
use crate::indexer::Indexer;
use crate::keys::KeySchema;
use crate::normalize::Normalizer;
use crate::provider::{Provider, ProviderMeta};
use crate::query::{QueryEngine, SuggestResult};
use crate::registry::Registry;
use crate::settings::{Settings, SettingsOverride};
use crate::store::RedisStore;
use serde_json::Value;

/// Default root namespace, matching `AUTOCOMPLETER_ROOT_NAMESPACE`'s default.
const DEFAULT_ROOT_NAMESPACE: &str = "djac";

#[derive(Clone)]
pub struct Engine {
    registry: Arc<tokio::sync::RwLock<Registry>>,
    indexer: Indexer,
    query_engine: QueryEngine,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Register an autocompleter with its ordered provider list, replacing
    /// any existing registration under the same name.
    pub async fn register_autocompleter(&self, name: &str, providers: Vec<Arc<dyn ProviderMeta>>) {
        self.registry.write().await.register_autocompleter(name, providers);
    }

    pub async fn register_provider(&self, name: &str, provider: Arc<dyn ProviderMeta>) {
        let mut registry = self.registry.write().await;
        let mut providers = registry.providers(name);
        providers.push(provider);
        registry.register_autocompleter(name, providers);
    }

    pub async fn set_provider_settings(&self, provider: &str, over: SettingsOverride) {
        self.registry.write().await.set_provider_settings(provider, over);
    }

    pub async fn set_pair_settings(&self, autocompleter: &str, provider: &str, over: SettingsOverride) {
        self.registry.write().await.set_pair_settings(autocompleter, provider, over);
    }

    pub async fn suggest(
        &self,
        autocompleter: &str,
        query: &str,
        facets: &FacetExpression,
    ) -> Result<SuggestResult> {
        let registry = self.registry.read().await;
        self.query_engine.suggest(&registry, autocompleter, query, facets).await
    }

    pub async fn exact_suggest(
        &self,
        autocompleter: &str,
        query: &str,
        facets: &FacetExpression,
    ) -> Result<SuggestResult> {
        let registry = self.registry.read().await;
        self.query_engine.exact_suggest(&registry, autocompleter, query, facets).await
    }

    /// Store a single item through a typed provider.
    pub async fn store<Item>(&self, provider: &impl Provider<Item>, item: &Item, delete_old: bool) -> Result<()> {
        self.indexer.store(provider, item, delete_old).await
    }

    pub async fn remove<Item>(&self, provider: &impl Provider<Item>, item: &Item) -> Result<()> {
        self.indexer.remove(provider, item).await
    }

    pub async fn store_all<Item>(
        &self,
        provider: &impl Provider<Item>,
        items: impl IntoIterator<Item = Item>,
        delete_old: bool,
    ) -> Result<usize> {
        self.indexer.store_all(provider, items, delete_old).await
    }

    /// Wipe every posting for `provider`, then invalidate the cache of every
    /// autocompleter that currently references it.
    pub async fn remove_all(&self, provider: &impl ProviderMeta) -> Result<()> {
        let owners = {
            let registry = self.registry.read().await;
            registry.autocompleters_for_provider(provider.provider_name())
        };
        self.indexer.remove_all(provider, &owners).await
    }

    /// Single payload lookup by (autocompleter, provider, id), bypassing
    /// matching entirely (`spec.md` §6). `Value::Null` stands in for the
    /// spec's "empty mapping" when nothing is found.
    pub async fn get_provider_result_from_id(
        &self,
        autocompleter: &str,
        provider_name: &str,
        id: &str,
    ) -> Result<Value> {
        let registry = self.registry.read().await;
        self.query_engine
            .get_provider_result_from_id(&registry, autocompleter, provider_name, id)
            .await
    }

    pub async fn health_check(&self) -> Result<()> {
        self.indexer.health_check().await
    }

    /// The indexer subsystem, for callers that need `store`/`remove` outside
    /// the typed-provider convenience methods above (`spec.md` §10.1).
    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    /// The query-engine subsystem backing `suggest`/`exact_suggest`.
    pub fn query_engine(&self) -> &QueryEngine {
        &self.query_engine
    }
}

/// Builder for [`Engine`]. Connection parameters may be supplied explicitly
/// or read from `AUTOCOMPLETER_REDIS_URL`/`AUTOCOMPLETER_ROOT_NAMESPACE` at
/// `build()` time (see `spec.md` §10.4).
#[derive(Default)]
pub struct EngineBuilder {
    redis_url: Option<String>,
    root_namespace: Option<String>,
    global_settings: Option<Settings>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    pub fn root_namespace(mut self, root: impl Into<String>) -> Self {
        self.root_namespace = Some(root.into());
        self
    }

    pub fn global_settings(mut self, settings: Settings) -> Self {
        self.global_settings = Some(settings);
        self
    }

    pub async fn build(self) -> Result<Engine> {
        let redis_url = self
            .redis_url
            .or_else(|| std::env::var("AUTOCOMPLETER_REDIS_URL").ok())
            .ok_or_else(|| Error::Configuration("AUTOCOMPLETER_REDIS_URL required".to_string()))?;
        let root_namespace = self
            .root_namespace
            .or_else(|| std::env::var("AUTOCOMPLETER_ROOT_NAMESPACE").ok())
            .unwrap_or_else(|| DEFAULT_ROOT_NAMESPACE.to_string());
        let settings = self.global_settings.unwrap_or_default();
        settings.validate()?;

        let store = RedisStore::connect(&redis_url).await?;
        Self::build_with_store(store, root_namespace, settings)
    }

    /// Build from an already-connected store, e.g. one borrowed from a test
    /// fixture's ephemeral Redis container.
    pub fn build_with_store(store: RedisStore, root_namespace: String, settings: Settings) -> Result<Engine> {
        settings.validate()?;
        let keys = KeySchema::new(root_namespace);
        let normalizer = Normalizer::new(settings.join_chars.clone(), &settings.character_filter)?;
        let cache = Cache::new(store.clone(), keys.clone());
        let indexer = Indexer::new(store.clone(), keys.clone(), normalizer, cache.clone());
        let query_engine = QueryEngine::new(store, keys, cache);
        let registry = Registry::new(settings);

        Ok(Engine {
            registry: Arc::new(tokio::sync::RwLock::new(registry)),
            indexer,
            query_engine,
        })
    }
}
