//! Optical character recognition resolvers.
//!
//! Two variants: `ocr` treats the fetched body directly as an image;
//! `ocr-page` first locates an `<img src>` inside the selected markup
//! of an HTML page and then recognizes the discovered image. Both shell
//! out to the `tesseract` CLI with the entity's configured language.

use std::io::Write;

use async_trait::async_trait;
use bytes::Bytes;
use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

use super::{HtmlResolver, RequestResolver, Resolver};
use crate::entity::ResolveRequest;
use crate::error::ParseError;
use crate::service::LunchService;

/// Run tesseract over an in-memory image.
async fn run_tesseract(image: Bytes, language: Option<&str>) -> Result<String, ParseError> {
    let mut file =
        tempfile::NamedTempFile::new().map_err(|err| ParseError::Ocr(err.to_string()))?;
    file.write_all(&image)
        .map_err(|err| ParseError::Ocr(err.to_string()))?;

    let mut command = tokio::process::Command::new("tesseract");
    command.arg(file.path()).arg("stdout");
    if let Some(language) = language {
        command.arg("-l").arg(language);
    }

    let output = command
        .output()
        .await
        .map_err(|err| ParseError::Ocr(format!("tesseract not runnable: {err}")))?;
    if !output.status.success() {
        return Err(ParseError::Ocr(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        return Err(ParseError::Ocr("empty recognition output".to_string()));
    }
    Ok(text)
}

/// Recognizes the fetched body as an image.
pub struct OcrResolver;

impl OcrResolver {
    pub(crate) async fn recognize(request: &ResolveRequest, image: Bytes) -> Option<String> {
        let language = request.entity.language.as_deref();
        match run_tesseract(image, language).await {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(entity = %request.entity.name, error = %err, "OCR failed");
                None
            }
        }
    }
}

#[async_trait]
impl Resolver for OcrResolver {
    fn name(&self) -> &str {
        "ocr"
    }

    fn cache_ext(&self) -> &str {
        "img"
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
        let image = service.cached_raw(self, request, None).await?;
        Self::recognize(request, image).await
    }
}

/// Locates an image inside the selected markup of an HTML page and
/// recognizes it.
pub struct PageOcrResolver;

impl PageOcrResolver {
    /// Derive the image request: select markup on the page, find the
    /// first `<img src>`, resolve it against the page URL.
    async fn image_request(
        service: &LunchService,
        request: &ResolveRequest,
    ) -> Option<ResolveRequest> {
        let page = HtmlResolver::page_bytes(service, request).await?;
        let html = String::from_utf8_lossy(&page);
        let markup = match HtmlResolver::select_markup(&html, request.selector()) {
            Ok(markup) => markup,
            Err(err) => {
                warn!(entity = %request.entity.name, error = %err, "HTML selection failed");
                return None;
            }
        };

        let src = match first_image_src(&markup) {
            Some(src) => src,
            None => {
                warn!(entity = %request.entity.name, error = %ParseError::NoImage, "no image in selection");
                return None;
            }
        };
        let image_url = absolutize(&src, request.url());

        let mut derived = request.clone();
        derived.url = Some(image_url);
        derived.selector = None;
        derived.content = None;
        Some(derived)
    }
}

fn first_image_src(markup: &str) -> Option<String> {
    let fragment = Html::parse_fragment(markup);
    let selector = Selector::parse("img").ok()?;
    fragment
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .map(str::to_string)
        .next()
}

/// Resolve a possibly-relative image source against the page URL.
fn absolutize(src: &str, base: Option<&str>) -> String {
    if let Some(base) = base {
        if let Ok(base_url) = Url::parse(base) {
            if let Ok(joined) = base_url.join(src) {
                return joined.to_string();
            }
        }
    }
    src.to_string()
}

#[async_trait]
impl Resolver for PageOcrResolver {
    fn name(&self) -> &str {
        "ocr-page"
    }

    fn cache_ext(&self) -> &str {
        "img"
    }

    async fn resolve(&self, service: &LunchService, request: &ResolveRequest) -> Option<Bytes> {
        let derived = Self::image_request(service, request).await?;
        RequestResolver.resolve(service, &derived).await
    }

    async fn resolve_text(
        &self,
        service: &LunchService,
        request: &ResolveRequest,
    ) -> Option<String> {
        let image = service.cached_raw(self, request, None).await?;
        OcrResolver::recognize(request, image).await
    }
}
