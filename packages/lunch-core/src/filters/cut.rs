//! Cut filter: keep the substring between two patterns.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use super::{Filter, FilterContext};
use crate::entity::Entity;

/// Returns the slice between the first match of a "cut-before" pattern
/// and the first following match of a "cut-after" pattern.
///
/// An absent or non-matching before-pattern defaults to the start of
/// the text, an absent or non-matching after-pattern to its end. Both
/// patterns are case-insensitive regexes.
pub struct CutFilter {
    before: Option<Regex>,
    after: Option<Regex>,
}

impl CutFilter {
    /// Build from explicit patterns.
    pub fn new(before: Option<&str>, after: Option<&str>) -> Self {
        Self {
            before: before.and_then(compile),
            after: after.and_then(compile),
        }
    }

    /// Build from the entity's cut markers.
    pub fn from_entity(entity: &Entity) -> Self {
        Self::new(entity.cut_before.as_deref(), entity.cut_after.as_deref())
    }

    /// Cut the text between the configured patterns.
    pub fn cut(&self, text: &str) -> String {
        let start = self
            .before
            .as_ref()
            .and_then(|re| re.find(text))
            .map(|m| m.start())
            .unwrap_or(0);
        let end = self
            .after
            .as_ref()
            .and_then(|re| re.find(&text[start..]))
            .map(|m| start + m.start())
            .unwrap_or(text.len());
        text[start..end].to_string()
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(err) => {
            warn!(pattern = %pattern, error = %err, "invalid cut pattern, ignoring");
            None
        }
    }
}

impl Filter for CutFilter {
    fn name(&self) -> &'static str {
        "cut"
    }

    fn apply(&self, text: &str, _ctx: &FilterContext<'_>) -> Option<String> {
        if text.is_empty() {
            return None;
        }
        Some(self.cut(text))
    }
}
