//! Mock resolver implementations for testing.
//!
//! Network-backed strategies are exercised through these injected
//! stand-ins instead of live HTTP.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::entity::ResolveRequest;
use crate::resolvers::Resolver;
use crate::service::LunchService;

/// Resolver returning a different canned payload on every raw call,
/// counting invocations. Exercises cache hit/miss behavior.
pub struct SequenceResolver {
    name: String,
    responses: Vec<String>,
    calls: Arc<AtomicUsize>,
}

impl SequenceResolver {
    /// Create with the canned responses, served in order (the last one
    /// repeats).
    pub fn new(name: impl Into<String>, responses: Vec<String>) -> Self {
        Self {
            name: name.into(),
            responses,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle counting raw calls made so far.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    fn next_response(&self) -> Option<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(call.min(self.responses.len().saturating_sub(1)))
            .cloned()
    }
}

#[async_trait]
impl Resolver for SequenceResolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, _service: &LunchService, _request: &ResolveRequest) -> Option<Bytes> {
        self.next_response().map(Bytes::from)
    }

    async fn resolve_text(
        &self,
        service: &LunchService,
        request: &ResolveRequest,
    ) -> Option<String> {
        let raw = service.cached_raw(self, request, None).await?;
        Some(String::from_utf8_lossy(&raw).into_owned())
    }
}

/// Resolver appending a fixed suffix to the threaded chain content.
/// Exercises chain threading semantics.
pub struct AppendResolver {
    name: String,
    suffix: String,
}

impl AppendResolver {
    pub fn new(name: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            suffix: suffix.into(),
        }
    }

    fn appended(&self, request: &ResolveRequest) -> String {
        match request.content_text() {
            Some(content) => format!("{}{}", content, self.suffix),
            None => self.suffix.clone(),
        }
    }
}

#[async_trait]
impl Resolver for AppendResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn use_cache(&self) -> bool {
        false
    }

    async fn resolve(&self, _service: &LunchService, request: &ResolveRequest) -> Option<Bytes> {
        Some(Bytes::from(self.appended(request)))
    }

    async fn resolve_text(
        &self,
        _service: &LunchService,
        request: &ResolveRequest,
    ) -> Option<String> {
        Some(self.appended(request))
    }
}

/// Resolver that always fails, for degraded-path tests.
pub struct FailingResolver {
    name: String,
}

impl FailingResolver {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Resolver for FailingResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn use_cache(&self) -> bool {
        false
    }

    async fn resolve(&self, _service: &LunchService, _request: &ResolveRequest) -> Option<Bytes> {
        None
    }

    async fn resolve_text(
        &self,
        _service: &LunchService,
        _request: &ResolveRequest,
    ) -> Option<String> {
        None
    }
}
