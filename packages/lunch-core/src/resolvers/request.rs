//! Raw network fetch against the entity URL.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use super::Resolver;
use crate::entity::ResolveRequest;
use crate::error::FetchError;
use crate::service::LunchService;

/// Browser-like user agents, rotated per request to reduce trivial
/// bot-blocking.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Issues the HTTP fetch with a randomized user agent merged with any
/// caller-specified headers. Non-2xx bodies are logged but still
/// forwarded when present.
pub struct RequestResolver;

impl RequestResolver {
    /// Fetch the request's effective URL.
    pub async fn fetch(
        service: &LunchService,
        request: &ResolveRequest,
    ) -> Result<Bytes, FetchError> {
        let url = request.url().ok_or(FetchError::MissingUrl)?;
        let user_agent = USER_AGENTS[fastrand::usize(..USER_AGENTS.len())];

        let mut builder = service
            .client()
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent);
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }

        debug!(url = %url, "fetch starting");
        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Request {
                    url: url.to_string(),
                    source: err,
                }
            }
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| FetchError::Request {
            url: url.to_string(),
            source: err,
        })?;

        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "non-2xx response");
            if body.is_empty() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
        }

        debug!(url = %url, bytes = body.len(), "fetched");
        Ok(body)
    }
}

#[async_trait]
impl Resolver for RequestResolver {
    fn name(&self) -> &str {
        "request"
    }

    async fn resolve(&self, service: &LunchService, request: &ResolveRequest) -> Option<Bytes> {
        match Self::fetch(service, request).await {
            Ok(body) => Some(body),
            Err(err) => {
                warn!(entity = %request.entity.name, error = %err, "fetch failed");
                None
            }
        }
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
