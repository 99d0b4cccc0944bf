//! PDF menu resolver.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

use super::{RequestResolver, Resolver};
use crate::entity::ResolveRequest;
use crate::error::ParseError;
use crate::service::LunchService;

/// Treats the fetched body as a PDF document and extracts its flowed
/// text. The result is prefixed with the source URL for traceability.
pub struct PdfResolver;

impl PdfResolver {
    async fn extract_text(raw: Bytes) -> Result<String, ParseError> {
        // pdf-extract is CPU-bound and synchronous.
        let extracted = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&raw).map_err(|err| ParseError::Pdf(err.to_string()))
        })
        .await
        .map_err(|err| ParseError::Pdf(err.to_string()))??;
        Ok(extracted.trim().to_string())
    }
}

#[async_trait]
impl Resolver for PdfResolver {
    fn name(&self) -> &str {
        "pdf"
    }

    fn cache_ext(&self) -> &str {
        "pdf"
    }

    async fn resolve(&self, service: &LunchService, request: &ResolveRequest) -> Option<Bytes> {
        match &request.content {
            Some(content) => Some(content.clone()),
            None => RequestResolver.resolve(service, request).await,
        }
    }

    async fn resolve_text(
        &self,
        service: &LunchService,
        request: &ResolveRequest,
    ) -> Option<String> {
        let raw = service.cached_raw(self, request, None).await?;
        let text = match Self::extract_text(raw).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => {
                warn!(entity = %request.entity.name, "PDF contained no text");
                return None;
            }
            Err(err) => {
                warn!(entity = %request.entity.name, error = %err, "PDF extraction failed");
                return None;
            }
        };
        match request.url() {
            Some(url) => Some(format!("{url}\n\n{text}")),
            None => Some(text),
        }
    }
}
