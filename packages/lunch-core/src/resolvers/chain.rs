//! Chain resolver: ordered composition of sub-resolvers.
//!
//! The only mechanism for multi-stage pipelines (fetch, locate image,
//! OCR; or fetch, select nodes, stringify) without a new top-level
//! resolver type. Each step threads the previous step's output into the
//! next step's content.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

use super::Resolver;
use crate::entity::ResolveRequest;
use crate::error::ConfigError;
use crate::service::LunchService;

/// Executes the entity's `resolver_chain` steps in order.
///
/// An unknown step resolver skips the step with the content unchanged;
/// a failing step likewise keeps the previous content. The chain itself
/// bypasses the day cache so it always re-derives from its (cached)
/// steps.
pub struct ChainResolver;

impl ChainResolver {
    async fn run(service: &LunchService, request: &ResolveRequest) -> Option<Bytes> {
        let mut content = request.content.clone();

        for (index, step) in request.entity.resolver_chain.iter().enumerate() {
            let Some(sub) = service.resolvers().get(&step.resolver) else {
                warn!(
                    entity = %request.entity.name,
                    step = index,
                    error = %ConfigError::UnknownResolver { name: step.resolver.clone() },
                    "skipping chain step"
                );
                continue;
            };

            let step_request = request.for_step(step, content.clone());
            let output = if step.raw {
                let suffix = format!("chain{}-{}", index, sub.name());
                service
                    .cached_raw(sub.as_ref(), &step_request, Some(suffix))
                    .await
            } else {
                sub.resolve_text(service, &step_request)
                    .await
                    .map(Bytes::from)
            };

            match output {
                Some(output) => content = Some(output),
                None => warn!(
                    entity = %request.entity.name,
                    step = index,
                    resolver = %step.resolver,
                    "chain step produced nothing, keeping previous content"
                ),
            }
        }

        content
    }
}

#[async_trait]
impl Resolver for ChainResolver {
    fn name(&self) -> &str {
        "chain"
    }

    fn use_cache(&self) -> bool {
        false
    }

    async fn resolve(&self, service: &LunchService, request: &ResolveRequest) -> Option<Bytes> {
        Self::run(service, request).await
    }

    async fn resolve_text(
        &self,
        service: &LunchService,
        request: &ResolveRequest,
    ) -> Option<String> {
        let content = Self::run(service, request).await?;
        Some(String::from_utf8_lossy(&content).into_owned())
    }
}
