//! Entity model: one configured menu source, plus the transient views
//! derived from it during a single resolution.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Resolver used when an entity names none, or names an unknown one.
pub const DEFAULT_RESOLVER: &str = "html";

/// One configured menu source.
///
/// Immutable by convention: registry mutations replace the whole record,
/// and per-resolution overrides live in [`ResolveRequest`], never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique key within a registry.
    pub name: String,

    /// Human-facing name; falls back to `name` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Source address. Required unless the resolver ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Source-format-specific locator: a CSS selector, or a provider
    /// query key (e.g. the Zomato venue id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Unordered, deduplicated selection tags.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,

    /// Name of the resolver strategy handling this entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver: Option<String>,

    /// Ordered sub-resolver steps. When non-empty the chain resolver is
    /// always used, regardless of `resolver`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolver_chain: Vec<ChainStep>,

    /// Filter names applied post-resolution, in declared order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,

    /// Custom weekday headings (Monday first), tried before the built-in
    /// locale tables by the day-cut filter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days: Vec<String>,

    /// Regex the day-cut/cut filter starts the slice at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cut_before: Option<String>,

    /// Regex the day-cut/cut filter ends the slice at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cut_after: Option<String>,

    /// Extra headers passed to the fetch step.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub request_params: HashMap<String, String>,

    /// Disabled entities are excluded from default selection but remain
    /// addressable by exact name.
    #[serde(default)]
    pub disabled: bool,

    /// ISO-ish language code driving OCR model selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Entity {
    /// Create a new entity with the given unique name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            url: None,
            selector: None,
            tags: BTreeSet::new(),
            resolver: None,
            resolver_chain: Vec::new(),
            filters: Vec::new(),
            days: Vec::new(),
            cut_before: None,
            cut_after: None,
            request_params: HashMap::new(),
            disabled: false,
            language: None,
        }
    }

    /// Set the source URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the human-facing name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set the source locator.
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Add selection tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Set the resolver strategy name.
    pub fn with_resolver(mut self, resolver: impl Into<String>) -> Self {
        self.resolver = Some(resolver.into());
        self
    }

    /// Append a chain step.
    pub fn with_chain_step(mut self, step: ChainStep) -> Self {
        self.resolver_chain.push(step);
        self
    }

    /// Append a post-resolution filter by name.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    /// Set custom weekday headings (Monday first).
    pub fn with_days<I, S>(mut self, days: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.days = days.into_iter().map(Into::into).collect();
        self
    }

    /// Set the OCR language code.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Mark the entity disabled.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Human-facing label: `display_name` when set, `name` otherwise.
    pub fn display_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Effective resolver kind. An explicit chain wins over `resolver`;
    /// an absent `resolver` falls back to [`DEFAULT_RESOLVER`].
    pub fn resolver_kind(&self) -> &str {
        if !self.resolver_chain.is_empty() {
            "chain"
        } else {
            self.resolver.as_deref().unwrap_or(DEFAULT_RESOLVER)
        }
    }

    /// Whether the entity carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.name)?;
        if let Some(display_name) = &self.display_name {
            write!(f, " ({display_name})")?;
        }
        if !self.tags.is_empty() {
            let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
            write!(f, " [{}]", tags.join(", "))?;
        }
        if let Some(url) = &self.url {
            write!(f, " {url}")?;
        }
        if let Some(selector) = &self.selector {
            write!(f, " ({selector})")?;
        }
        Ok(())
    }
}

/// One step of a resolver chain.
///
/// A step never mutates its entity; at execution time it is merged with
/// the entity into a transient [`ResolveRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStep {
    /// Name of the sub-resolver executing this step.
    pub resolver: String,

    /// Step-local URL override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Step-local selector override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Step-local extra request headers.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub request_params: HashMap<String, String>,

    /// Request raw output from the sub-resolver instead of text.
    #[serde(default)]
    pub raw: bool,

    /// Skip the day cache for this step. Used for pure intermediate
    /// steps that must always re-derive from already-cached upstream
    /// content.
    #[serde(default)]
    pub no_cache: bool,
}

impl ChainStep {
    /// Create a step executed by the named sub-resolver.
    pub fn new(resolver: impl Into<String>) -> Self {
        Self {
            resolver: resolver.into(),
            url: None,
            selector: None,
            request_params: HashMap::new(),
            raw: false,
            no_cache: false,
        }
    }

    /// Override the URL for this step.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Override the selector for this step.
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Request raw sub-resolver output.
    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    /// Disable caching for this step.
    pub fn no_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }
}

/// Per-resolution view combining an entity's static config with overrides
/// and any content threaded in from a previous chain step.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// The entity being resolved.
    pub entity: Entity,

    /// Calendar day the resolution is keyed under.
    pub day: NaiveDate,

    /// URL override (chain step); falls back to the entity URL.
    pub url: Option<String>,

    /// Selector override (chain step); falls back to the entity selector.
    pub selector: Option<String>,

    /// Extra request headers merged over the entity's.
    pub request_params: HashMap<String, String>,

    /// Content produced by the previous chain step, if any.
    pub content: Option<Bytes>,

    /// Skip the day cache for this resolution step.
    pub no_cache: bool,
}

impl ResolveRequest {
    /// Build the request for a plain (non-chain-step) resolution.
    pub fn for_entity(entity: &Entity, day: NaiveDate) -> Self {
        Self {
            entity: entity.clone(),
            day,
            url: None,
            selector: None,
            request_params: HashMap::new(),
            content: None,
            no_cache: false,
        }
    }

    /// Derive a step request from this one and a chain step.
    pub fn for_step(&self, step: &ChainStep, content: Option<Bytes>) -> Self {
        Self {
            entity: self.entity.clone(),
            day: self.day,
            url: step.url.clone(),
            selector: step.selector.clone(),
            request_params: step.request_params.clone(),
            content,
            no_cache: step.no_cache,
        }
    }

    /// Effective URL: step override first, then the entity's.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().or(self.entity.url.as_deref())
    }

    /// Effective selector: step override first, then the entity's.
    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref().or(self.entity.selector.as_deref())
    }

    /// Entity headers merged with step-local overrides (step wins).
    pub fn headers(&self) -> HashMap<&str, &str> {
        let mut merged: HashMap<&str, &str> = self
            .entity
            .request_params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        for (k, v) in &self.request_params {
            merged.insert(k.as_str(), v.as_str());
        }
        merged
    }

    /// Threaded chain content decoded as UTF-8 text.
    pub fn content_text(&self) -> Option<String> {
        self.content
            .as_ref()
            .map(|c| String::from_utf8_lossy(c).into_owned())
    }
}

/// Caller options for a single resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Return the resolver output without running the filter pipeline.
    pub skip_filters: bool,

    /// Run filters but skip the day-cut, returning the whole menu.
    pub full: bool,

    /// Resolve for an explicit calendar day instead of today.
    pub day: Option<NaiveDate>,
}

impl ResolveOptions {
    /// Options requesting the default, filtered, today's slice.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the filter pipeline entirely.
    pub fn skip_filters(mut self) -> Self {
        self.skip_filters = true;
        self
    }

    /// Request the full, un-day-cut menu.
    pub fn full(mut self) -> Self {
        self.full = true;
        self
    }

    /// Pin the resolution to a specific day.
    pub fn on_day(mut self, day: NaiveDate) -> Self {
        self.day = Some(day);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_builder() {
        let entity = Entity::new("pizza-house")
            .with_url("https://pizza.example.com/menu")
            .with_selector("#menu")
            .with_tags(["pizza", "cheap"])
            .with_filter("day");

        assert_eq!(entity.name, "pizza-house");
        assert_eq!(entity.display_label(), "pizza-house");
        assert!(entity.has_tag("pizza"));
        assert_eq!(entity.resolver_kind(), DEFAULT_RESOLVER);
    }

    #[test]
    fn test_chain_wins_over_named_resolver() {
        let entity = Entity::new("ocr-place")
            .with_resolver("pdf")
            .with_chain_step(ChainStep::new("request").raw())
            .with_chain_step(ChainStep::new("ocr"));

        assert_eq!(entity.resolver_kind(), "chain");
    }

    #[test]
    fn test_request_overrides() {
        let entity = Entity::new("a")
            .with_url("https://a.example.com")
            .with_selector(".menu");
        let day = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let request = ResolveRequest::for_entity(&entity, day);

        assert_eq!(request.url(), Some("https://a.example.com"));
        assert_eq!(request.selector(), Some(".menu"));

        let step = ChainStep::new("html").with_selector("img");
        let derived = request.for_step(&step, Some(Bytes::from_static(b"x")));
        assert_eq!(derived.selector(), Some("img"));
        assert_eq!(derived.url(), Some("https://a.example.com"));
        assert_eq!(derived.content_text().as_deref(), Some("x"));
    }

    #[test]
    fn test_display_formatting() {
        let entity = Entity::new("kocka")
            .with_display_name("Zelena Kocka")
            .with_url("https://kocka.example.com")
            .with_tags(["vegetarian"]);

        let rendered = entity.to_string();
        assert!(rendered.contains("\"kocka\""));
        assert!(rendered.contains("(Zelena Kocka)"));
        assert!(rendered.contains("[vegetarian]"));
    }
}
