//! Resolver strategies: pluggable extraction of menu content.
//!
//! A resolver turns an entity's source reference into content, raw or
//! text. Resolvers never propagate fetch/parse failures to the caller;
//! they log and return an absent result so one failing entity never
//! aborts a batch.

mod chain;
mod html;
mod ocr;
mod pdf;
mod request;
mod zomato;

pub use chain::ChainResolver;
pub use html::{markup_to_text, HtmlResolver};
pub use ocr::{OcrResolver, PageOcrResolver};
pub use pdf::PdfResolver;
pub use request::RequestResolver;
pub use zomato::{ZomatoResolver, ZOMATO_NOT_CONFIGURED};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;
use tracing::warn;

use crate::entity::{Entity, ResolveRequest, DEFAULT_RESOLVER};
use crate::error::ConfigError;
use crate::service::LunchService;

/// One extraction strategy.
///
/// `resolve` produces the raw artifact (page markup, PDF bytes, image
/// bytes, API payload); `resolve_text` the plain-text rendition. The
/// service wraps `resolve` calls in the day cache keyed by
/// `name`/`cache_ext`, except for strategies reporting `use_cache() ==
/// false`, which must always re-derive from already-cached upstream
/// content.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Registry name, also the default cache-key suffix.
    fn name(&self) -> &str;

    /// File extension of the cached raw artifact.
    fn cache_ext(&self) -> &str {
        "txt"
    }

    /// Whether the raw artifact participates in the day cache.
    fn use_cache(&self) -> bool {
        true
    }

    /// Produce the raw artifact, or absent on failure.
    async fn resolve(&self, service: &LunchService, request: &ResolveRequest) -> Option<Bytes>;

    /// Produce the plain-text rendition, or absent on failure.
    async fn resolve_text(&self, service: &LunchService, request: &ResolveRequest)
        -> Option<String>;
}

/// Registry of resolver strategies by name.
///
/// Injected into the service so chain steps can look up their
/// sub-resolvers without any global state.
pub struct ResolverSet {
    resolvers: IndexMap<String, Arc<dyn Resolver>>,
}

impl Default for ResolverSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ResolverSet {
    /// An empty set.
    pub fn new() -> Self {
        Self {
            resolvers: IndexMap::new(),
        }
    }

    /// The built-in strategy set.
    pub fn with_defaults() -> Self {
        let mut set = Self::new();
        set.register(Arc::new(RequestResolver));
        set.register(Arc::new(HtmlResolver));
        set.register(Arc::new(PdfResolver));
        set.register(Arc::new(OcrResolver));
        set.register(Arc::new(PageOcrResolver));
        set.register(Arc::new(ZomatoResolver));
        set.register(Arc::new(ChainResolver));
        set
    }

    /// Register a strategy under its own name, replacing any previous
    /// one.
    pub fn register(&mut self, resolver: Arc<dyn Resolver>) {
        self.resolvers
            .insert(resolver.name().to_string(), resolver);
    }

    /// Look up a strategy by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Resolver>> {
        self.resolvers.get(name).cloned()
    }

    /// Strategy handling the given entity.
    ///
    /// An explicit chain always wins; an unknown resolver name degrades
    /// to the default strategy with a warning.
    pub fn for_entity(&self, entity: &Entity) -> Option<Arc<dyn Resolver>> {
        let kind = entity.resolver_kind();
        self.get(kind).or_else(|| {
            warn!(
                entity = %entity.name,
                error = %ConfigError::UnknownResolver { name: kind.to_string() },
                "falling back to default resolver"
            );
            self.get(DEFAULT_RESOLVER)
        })
    }

    /// Registered strategy names, registration-ordered.
    pub fn names(&self) -> Vec<&str> {
        self.resolvers.keys().map(String::as_str).collect()
    }
}
