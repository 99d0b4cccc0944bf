//! Registry of configured menu sources.
//!
//! Holds entities by unique name in insertion order and provides the
//! unified selection contract used by every external caller: exact
//! lookup, fuzzy nearest-match, and tag-expression multi-select.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::entity::Entity;
use crate::error::Result;
use crate::tags::TagEvaluator;

/// How [`Registry::select`] interprets its selector tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectOptions {
    /// Treat selectors as fuzzy names instead of exact ones.
    pub fuzzy: bool,

    /// Treat the joined selectors as one tag expression.
    pub by_tags: bool,

    /// Keep disabled entities in the result.
    pub include_disabled: bool,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fuzzy(mut self) -> Self {
        self.fuzzy = true;
        self
    }

    pub fn by_tags(mut self) -> Self {
        self.by_tags = true;
        self
    }

    pub fn include_disabled(mut self) -> Self {
        self.include_disabled = true;
        self
    }
}

/// Mapping from name to entity, insertion-ordered.
#[derive(Debug, Default)]
pub struct Registry {
    entities: IndexMap<String, Entity>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity. Re-registration under an existing name is a
    /// logged no-op unless `override_existing` is set.
    pub fn register(&mut self, entity: Entity, override_existing: bool) -> bool {
        if self.entities.contains_key(&entity.name) && !override_existing {
            info!(name = %entity.name, "already registered, skipping");
            return false;
        }
        info!(name = %entity.name, entity = %entity, "registering instance");
        self.entities.insert(entity.name.clone(), entity);
        true
    }

    /// Remove an entity by exact name.
    pub fn remove(&mut self, name: &str) -> Option<Entity> {
        let removed = self.entities.shift_remove(name);
        if removed.is_some() {
            info!(name = %name, "removed instance");
        }
        removed
    }

    /// Enable or disable an entity. Returns false when the name is
    /// unknown.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.entities.get_mut(name) {
            Some(entity) => {
                entity.disabled = !enabled;
                info!(name = %name, enabled = enabled, "instance toggled");
                true
            }
            None => {
                warn!(name = %name, "cannot toggle unknown instance");
                false
            }
        }
    }

    /// Exact lookup.
    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in insertion order.
    pub fn all(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Union of all entities' tags.
    pub fn all_tags(&self) -> BTreeSet<String> {
        self.entities
            .values()
            .flat_map(|entity| entity.tags.iter().cloned())
            .collect()
    }

    /// Ranked fuzzy matches over names and display names, best first.
    pub fn fuzzy_find(&self, name: &str, limit: usize) -> Vec<(&Entity, f64)> {
        let mut scored: Vec<(&Entity, f64)> = self
            .entities
            .values()
            .map(|entity| (entity, similarity(name, entity)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);
        scored
    }

    /// Single best fuzzy match, or `None` when the registry is empty.
    pub fn fuzzy_find_one(&self, name: &str) -> Option<&Entity> {
        let best = self.fuzzy_find(name, 1).into_iter().next();
        if let Some((entity, score)) = &best {
            debug!(query = %name, matched = %entity.name, score = score, "fuzzy match");
        }
        best.map(|(entity, _)| entity)
    }

    /// Exact lookup falling back to fuzzy match ("find-one" semantics).
    pub fn find_one(&self, name: &str) -> Option<&Entity> {
        self.get(name).or_else(|| {
            warn!(name = %name, "not found exactly, trying fuzzy match");
            self.fuzzy_find_one(name)
        })
    }

    /// Entities matching a tag expression, in registry order.
    pub fn find_by_tags(&self, expression: &str) -> Result<Vec<&Entity>> {
        let evaluator = TagEvaluator::new(self.all_tags());
        Ok(evaluator.select_matching(expression, self.all())?)
    }

    /// Unified selection contract.
    ///
    /// - no selectors: all entities
    /// - `by_tags`: one tag expression joined from the selectors
    /// - `fuzzy`: per-token fuzzy lookup
    /// - otherwise: per-token exact lookup with fuzzy fallback
    ///
    /// Disabled entities are dropped after selection unless
    /// `include_disabled` is set. Results never contain duplicates of
    /// misses; a selector that matches nothing contributes nothing.
    pub fn select(&self, selectors: &[String], options: SelectOptions) -> Result<Vec<Entity>> {
        let selected: Vec<&Entity> = if selectors.is_empty() {
            self.all().collect()
        } else if options.by_tags {
            self.find_by_tags(&selectors.join(" "))?
        } else if options.fuzzy {
            selectors
                .iter()
                .filter_map(|token| self.fuzzy_find_one(token))
                .collect()
        } else {
            selectors
                .iter()
                .filter_map(|token| self.find_one(token))
                .collect()
        };

        Ok(selected
            .into_iter()
            .filter(|entity| options.include_disabled || !entity.disabled)
            .cloned()
            .collect())
    }
}

/// Token-order-insensitive similarity between a query and an entity.
///
/// Equivalent of fuzzywuzzy's `token_sort_ratio`: both sides are
/// lowercased, split on non-alphanumeric characters, re-joined sorted,
/// then compared by normalized Levenshtein distance. The better of the
/// name and display-name scores wins.
fn similarity(query: &str, entity: &Entity) -> f64 {
    let query_key = token_sort_key(query);
    let name_score = strsim::normalized_levenshtein(&query_key, &token_sort_key(&entity.name));
    let display_score = entity
        .display_name
        .as_deref()
        .map(|display| strsim::normalized_levenshtein(&query_key, &token_sort_key(display)))
        .unwrap_or(0.0);
    name_score.max(display_score)
}

fn token_sort_key(value: &str) -> String {
    let mut tokens: Vec<String> = value
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();
    tokens.sort();
    tokens.join(" ")
}
