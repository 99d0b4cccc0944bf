//! Post-resolution content filters.
//!
//! Filters are stateless text transforms applied after resolution, in
//! the order the entity declares them. An unknown filter name degrades
//! to "skip this step, keep prior content" with a warning; it never
//! fails the resolution.

mod cut;
mod day;

pub use cut::CutFilter;
pub use day::DayCutFilter;

use chrono::NaiveDate;
use regex::Regex;
use tracing::warn;

use crate::entity::Entity;

/// Resolution-time context threaded through the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    /// Entity the text was resolved for.
    pub entity: &'a Entity,

    /// Day the resolution is keyed under; drives the day-cut filter.
    pub day: NaiveDate,

    /// Set when full, unfiltered content was requested; the day-cut
    /// filter is skipped entirely.
    pub skip_day_filter: bool,
}

/// One named text transform.
///
/// Returning `None` means the filter consumed the content entirely
/// (e.g. a cut with no input); the pipeline then yields an absent
/// result.
pub trait Filter: Send + Sync {
    /// Registry name of this filter.
    fn name(&self) -> &'static str;

    /// Transform the text.
    fn apply(&self, text: &str, ctx: &FilterContext<'_>) -> Option<String>;
}

/// Passthrough filter, the default/base transform.
pub struct IdentityFilter;

impl Filter for IdentityFilter {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn apply(&self, text: &str, _ctx: &FilterContext<'_>) -> Option<String> {
        Some(text.to_string())
    }
}

/// Collapses runs of two or more newlines into one.
pub struct NewlinesFilter;

impl Filter for NewlinesFilter {
    fn name(&self) -> &'static str {
        "newlines"
    }

    fn apply(&self, text: &str, _ctx: &FilterContext<'_>) -> Option<String> {
        let collapse = Regex::new(r"\n{2,}").ok()?;
        Some(collapse.replace_all(text, "\n").into_owned())
    }
}

/// Look up a filter by name, configured for the given entity.
pub fn filter_by_name(name: &str, entity: &Entity) -> Option<Box<dyn Filter>> {
    match name {
        "identity" | "pass" => Some(Box::new(IdentityFilter)),
        "newlines" | "nl" => Some(Box::new(NewlinesFilter)),
        "cut" => Some(Box::new(CutFilter::from_entity(entity))),
        "day" | "day-cut" => Some(Box::new(DayCutFilter::new())),
        _ => None,
    }
}

/// Run the entity's declared filter pipeline over resolved text.
///
/// Each filter receives the previous filter's output; unknown names are
/// skipped with a warning.
pub fn apply_pipeline(entity: &Entity, text: &str, ctx: &FilterContext<'_>) -> Option<String> {
    let mut current = text.to_string();
    for name in &entity.filters {
        let Some(filter) = filter_by_name(name, entity) else {
            warn!(entity = %entity.name, filter = %name, "unknown filter, skipping");
            continue;
        };
        current = filter.apply(&current, ctx)?;
    }
    Some(current)
}
