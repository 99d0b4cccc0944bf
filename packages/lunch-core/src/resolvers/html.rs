//! HTML page resolver: fetch, select, strip to text.

use async_trait::async_trait;
use bytes::Bytes;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use super::{RequestResolver, Resolver};
use crate::entity::ResolveRequest;
use crate::error::ParseError;
use crate::service::LunchService;

/// Wraps the request resolver; parses the response as HTML, applies the
/// entity's CSS selector, and serializes the selected subset back to
/// markup. `resolve_text` strips that markup down to plain text, with
/// links, images, tables and emphasis discarded.
pub struct HtmlResolver;

impl HtmlResolver {
    /// Raw page bytes: threaded chain content when present, otherwise a
    /// cached fetch.
    pub(crate) async fn page_bytes(
        service: &LunchService,
        request: &ResolveRequest,
    ) -> Option<Bytes> {
        match &request.content {
            Some(content) => Some(content.clone()),
            None => service.cached_raw(&RequestResolver, request, None).await,
        }
    }

    /// Serialize the nodes matching the selector back to markup.
    /// Without a selector the whole document passes through.
    pub(crate) fn select_markup(
        html: &str,
        selector: Option<&str>,
    ) -> Result<String, ParseError> {
        let document = Html::parse_document(html);
        let Some(selector) = selector else {
            return Ok(document.root_element().html());
        };

        let compiled = Selector::parse(selector).map_err(|_| ParseError::Selector {
            selector: selector.to_string(),
        })?;
        let parts: Vec<String> = document
            .select(&compiled)
            .map(|element| element.html())
            .collect();
        if parts.is_empty() {
            return Err(ParseError::EmptySelection {
                selector: selector.to_string(),
            });
        }
        Ok(parts.join("\n"))
    }
}

#[async_trait]
impl Resolver for HtmlResolver {
    fn name(&self) -> &str {
        "html"
    }

    fn cache_ext(&self) -> &str {
        "html"
    }

    async fn resolve(&self, service: &LunchService, request: &ResolveRequest) -> Option<Bytes> {
        let page = Self::page_bytes(service, request).await?;
        let html = String::from_utf8_lossy(&page);
        match Self::select_markup(&html, request.selector()) {
            Ok(markup) => Some(Bytes::from(markup)),
            Err(err) => {
                warn!(entity = %request.entity.name, error = %err, "HTML selection failed");
                None
            }
        }
    }

    async fn resolve_text(
        &self,
        service: &LunchService,
        request: &ResolveRequest,
    ) -> Option<String> {
        let markup = service.cached_raw(self, request, None).await?;
        let text = markup_to_text(&String::from_utf8_lossy(&markup));
        if text.is_empty() {
            return None;
        }
        Some(text)
    }
}

/// Elements that force a line break around their content.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "table", "thead", "tbody", "tr", "h1", "h2", "h3", "h4",
    "h5", "h6", "section", "article", "header", "footer", "blockquote",
];

/// Strip markup down to plain text.
///
/// Text nodes are concatenated; block-level boundaries become newlines;
/// scripts and styles are dropped. Inline markup (links, emphasis)
/// contributes only its text content.
pub fn markup_to_text(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let mut out = String::new();
    collect_text(fragment.root_element(), &mut out);
    normalize(&out)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }
        let Some(child_element) = ElementRef::wrap(child) else {
            continue;
        };
        let tag = child_element.value().name();
        if matches!(tag, "script" | "style" | "img") {
            continue;
        }
        let block = BLOCK_TAGS.contains(&tag);
        if block && !out.ends_with('\n') {
            out.push('\n');
        }
        collect_text(child_element, out);
        if block && !out.ends_with('\n') {
            out.push('\n');
        }
    }
}

/// Trim each line and drop leading/trailing blank runs.
fn normalize(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut result = Vec::with_capacity(lines.len());
    let mut blank_run = true;
    for line in lines {
        if line.is_empty() {
            if !blank_run {
                result.push(line);
            }
            blank_run = true;
        } else {
            result.push(line);
            blank_run = false;
        }
    }
    while result.last() == Some(&"") {
        result.pop();
    }
    result.join("\n")
}
