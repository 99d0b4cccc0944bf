//! Lunch service: wires registry, resolvers, filters and cache into a
//! single resolution entrypoint.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, DayCache};
use crate::config::AppConfig;
use crate::entity::{Entity, ResolveOptions, ResolveRequest};
use crate::error::{ConfigError, Result};
use crate::filters::{self, FilterContext};
use crate::registry::{Registry, SelectOptions};
use crate::resolvers::{Resolver, ResolverSet, ZOMATO_NOT_CONFIGURED};

/// Orchestrator owning the registry and cache for its lifetime.
///
/// Constructed once at startup and shared by reference (typically an
/// `Arc`) with every consumer; there is no global instance.
pub struct LunchService {
    config: AppConfig,
    instances: Registry,
    resolvers: ResolverSet,
    cache: DayCache,
    client: reqwest::Client,
}

impl LunchService {
    /// Build a service over an already-loaded registry.
    pub fn new(config: AppConfig, instances: Registry) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("Failed to create HTTP client");
        let cache = DayCache::new(config.cache_dir.clone(), config.cache_enabled);

        Self {
            config,
            instances,
            resolvers: ResolverSet::with_defaults(),
            cache,
            client,
        }
    }

    /// App-level configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The entity registry.
    pub fn instances(&self) -> &Registry {
        &self.instances
    }

    /// Mutable registry access, for add/remove/enable/disable.
    pub fn instances_mut(&mut self) -> &mut Registry {
        &mut self.instances
    }

    /// The day cache.
    pub fn cache(&self) -> &DayCache {
        &self.cache
    }

    /// The resolver strategy set.
    pub fn resolvers(&self) -> &ResolverSet {
        &self.resolvers
    }

    /// Mutable resolver set access, for registering custom strategies
    /// before the service is shared.
    pub fn resolvers_mut(&mut self) -> &mut ResolverSet {
        &mut self.resolvers
    }

    /// Shared HTTP client used by all fetching resolvers.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Unified entity selection; see [`Registry::select`].
    pub fn select_instances(
        &self,
        selectors: &[String],
        options: SelectOptions,
    ) -> Result<Vec<Entity>> {
        let selected = self.instances.select(selectors, options)?;
        if selected.is_empty() {
            info!(selectors = ?selectors, "no instance found");
        }
        Ok(selected)
    }

    /// Resolve an entity to its final, filtered text.
    ///
    /// The result is memoized in the day cache; failures at any stage
    /// yield an absent result, except the Zomato missing-credential
    /// case which substitutes an explanatory message.
    pub async fn resolve_text(&self, entity: &Entity, options: &ResolveOptions) -> Option<String> {
        let day = options.day.unwrap_or_else(DayCache::today);

        let suffix = match (options.skip_filters, options.full) {
            (true, _) => "text-unfiltered",
            (false, true) => "text-full",
            (false, false) => "text",
        };
        let key = CacheKey::new(day, &entity.name, Some(suffix.to_string()), "txt");

        let resolved = self
            .cache
            .wrap(&key, || async {
                self.resolve_text_uncached(entity, options, day)
                    .await
                    .map(Bytes::from)
            })
            .await
            .map(|content| String::from_utf8_lossy(&content).into_owned());

        if resolved.is_none() && self.zomato_unconfigured(entity) {
            return Some(ZOMATO_NOT_CONFIGURED.to_string());
        }
        resolved
    }

    /// Resolve an entity to its pre-filter, pre-text-conversion markup
    /// form, for HTML-format renderers.
    pub async fn resolve_html(&self, entity: &Entity, options: &ResolveOptions) -> Option<String> {
        let day = options.day.unwrap_or_else(DayCache::today);
        let resolver = self.resolvers.for_entity(entity)?;
        let request = ResolveRequest::for_entity(entity, day);
        let raw = self.cached_raw(resolver.as_ref(), &request, None).await?;
        Some(String::from_utf8_lossy(&raw).into_owned())
    }

    /// Resolve a batch of entities concurrently (bounded), preserving
    /// the input order in the results.
    pub async fn resolve_many(
        self: &Arc<Self>,
        entities: Vec<Entity>,
        options: ResolveOptions,
    ) -> Vec<(Entity, Option<String>)> {
        let limit = self.config.max_concurrent_resolves.max(1);
        let semaphore = Arc::new(Semaphore::new(limit));

        let mut handles = Vec::with_capacity(entities.len());
        for entity in entities {
            let service = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            let options = options.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let text = service.resolve_text(&entity, &options).await;
                (entity, text)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(err) => warn!(error = %err, "batch resolve task failed"),
            }
        }
        results
    }

    /// Human-facing listing of all registered instances.
    pub fn available_listing(&self) -> String {
        let mut listing = String::from("Available:\n");
        for entity in self.instances.all() {
            let marker = if entity.disabled { " (disabled)" } else { "" };
            let url = entity.url.as_deref().unwrap_or("-");
            let _ = writeln!(listing, " - {} - {}{}", entity.name, url, marker);
        }
        listing
    }

    /// Cache-wrapped raw resolution, keyed by resolver kind.
    ///
    /// Cache-disabled resolvers and `no_cache` step requests always
    /// call through.
    pub(crate) async fn cached_raw(
        &self,
        resolver: &dyn Resolver,
        request: &ResolveRequest,
        suffix_override: Option<String>,
    ) -> Option<Bytes> {
        if !resolver.use_cache() || request.no_cache {
            return resolver.resolve(self, request).await;
        }
        let suffix = suffix_override.unwrap_or_else(|| resolver.name().to_string());
        let key = CacheKey::new(
            request.day,
            &request.entity.name,
            Some(suffix),
            resolver.cache_ext(),
        );
        self.cache
            .wrap(&key, || resolver.resolve(self, request))
            .await
    }

    async fn resolve_text_uncached(
        &self,
        entity: &Entity,
        options: &ResolveOptions,
        day: chrono::NaiveDate,
    ) -> Option<String> {
        let resolver = self.resolvers.for_entity(entity)?;
        let request = ResolveRequest::for_entity(entity, day);

        debug!(entity = %entity.name, resolver = %resolver.name(), "resolving");
        let text = resolver.resolve_text(self, &request).await?;
        if options.skip_filters {
            return Some(text);
        }

        let ctx = FilterContext {
            entity,
            day,
            skip_day_filter: options.full,
        };
        filters::apply_pipeline(entity, &text, &ctx)
    }

    fn zomato_unconfigured(&self, entity: &Entity) -> bool {
        if entity.resolver_kind() != "zomato" || self.config.zomato_api_key.is_some() {
            return false;
        }
        warn!(
            entity = %entity.name,
            error = %ConfigError::MissingCredential { name: "zomato_api_key".to_string() },
            "substituting setup hint for menu content"
        );
        true
    }
}
