//! Day-cut filter: slice out a single weekday from a whole-week menu.

use chrono::Datelike;
use regex::RegexBuilder;
use tracing::debug;

use super::{Filter, FilterContext};

/// Built-in weekday heading synonyms, Monday first. Czech, Slovak
/// (with and without diacritics), English and German; entity-supplied
/// custom lists are tried before these.
const WEEKDAYS: [&[&str]; 7] = [
    &["pondělí", "pondeli", "pondelok", "monday", "montag"],
    &["úterý", "utery", "utorok", "tuesday", "dienstag"],
    &["středa", "streda", "wednesday", "mittwoch"],
    &["čtvrtek", "ctvrtek", "štvrtok", "stvrtok", "thursday", "donnerstag"],
    &["pátek", "patek", "piatok", "friday", "freitag"],
    &["sobota", "saturday", "samstag"],
    &["neděle", "nedele", "nedeľa", "sunday", "sonntag"],
];

/// Cuts a whole-week menu down to one day's slice.
///
/// The slice starts at the heading of the `from` day and ends at the
/// heading of the `to` day (default: the following day). A heading that
/// is not found falls back to the start or end of the text, so a menu
/// without recognizable headings passes through whole.
pub struct DayCutFilter {
    day_from: Option<usize>,
    day_to: Option<usize>,
}

impl Default for DayCutFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl DayCutFilter {
    /// Cut for the context day, ending at the following day.
    pub fn new() -> Self {
        Self {
            day_from: None,
            day_to: None,
        }
    }

    /// Cut an explicit weekday range (0 = Monday).
    pub fn with_range(day_from: usize, day_to: Option<usize>) -> Self {
        Self {
            day_from: Some(day_from),
            day_to,
        }
    }

    fn cut(&self, text: &str, ctx: &FilterContext<'_>) -> String {
        let from = self
            .day_from
            .unwrap_or_else(|| ctx.day.weekday().num_days_from_monday() as usize);
        let to = self.day_to.unwrap_or(from + 1);

        let custom = &ctx.entity.days;
        let start = find_heading(text, 0, from, custom).unwrap_or(0);
        let end = if to < WEEKDAYS.len() {
            find_heading(text, start, to, custom).unwrap_or(text.len())
        } else {
            text.len()
        };
        debug!(from = from, to = to, start = start, end = end, "day cut");
        text[start..end].to_string()
    }
}

/// Byte offset of the first heading for weekday `day` at or after
/// `search_from`. Custom entity headings are tried before the built-in
/// locale tables.
fn find_heading(text: &str, search_from: usize, day: usize, custom: &[String]) -> Option<usize> {
    if day >= WEEKDAYS.len() {
        return None;
    }

    if custom.len() == WEEKDAYS.len() {
        if let Some(pos) = find_in(text, search_from, &custom[day]) {
            return Some(pos);
        }
    }

    WEEKDAYS[day]
        .iter()
        .filter_map(|synonym| find_in(text, search_from, synonym))
        .min()
}

fn find_in(text: &str, search_from: usize, needle: &str) -> Option<usize> {
    let re = RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
        .ok()?;
    re.find(&text[search_from..])
        .map(|m| search_from + m.start())
}

impl Filter for DayCutFilter {
    fn name(&self) -> &'static str {
        "day"
    }

    fn apply(&self, text: &str, ctx: &FilterContext<'_>) -> Option<String> {
        if ctx.skip_day_filter {
            return Some(text.to_string());
        }
        if text.is_empty() {
            return None;
        }
        Some(self.cut(text, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use chrono::NaiveDate;

    const WEEK_MENU: &str = "Monday\nsoup A\nTuesday\nsoup B\nWednesday\nsoup C\n";

    fn monday_ctx<'a>(entity: &'a Entity) -> FilterContext<'a> {
        FilterContext {
            entity,
            // 2025-03-03 is a Monday.
            day: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            skip_day_filter: false,
        }
    }

    #[test]
    fn test_monday_slice() {
        let entity = Entity::new("a");
        let ctx = monday_ctx(&entity);
        let out = DayCutFilter::new().apply(WEEK_MENU, &ctx).unwrap();
        assert_eq!(out, "Monday\nsoup A\n");
    }

    #[test]
    fn test_explicit_range() {
        let entity = Entity::new("a");
        let ctx = monday_ctx(&entity);
        let out = DayCutFilter::with_range(1, Some(2))
            .apply(WEEK_MENU, &ctx)
            .unwrap();
        assert_eq!(out, "Tuesday\nsoup B\n");
    }

    #[test]
    fn test_no_headings_passes_whole_text() {
        let entity = Entity::new("a");
        let ctx = monday_ctx(&entity);
        let out = DayCutFilter::new().apply("daily menu, no headings", &ctx).unwrap();
        assert_eq!(out, "daily menu, no headings");
    }

    #[test]
    fn test_czech_headings() {
        let entity = Entity::new("a");
        let ctx = monday_ctx(&entity);
        let menu = "Pondělí\npolévka\nÚterý\nguláš\n";
        let out = DayCutFilter::new().apply(menu, &ctx).unwrap();
        assert_eq!(out, "Pondělí\npolévka\n");
    }

    #[test]
    fn test_custom_day_list_wins() {
        let entity = Entity::new("a").with_days(["po", "ut", "st", "ct", "pa", "so", "ne"]);
        let ctx = monday_ctx(&entity);
        let menu = "PO: soup\nUT: goulash\n";
        let out = DayCutFilter::new().apply(menu, &ctx).unwrap();
        assert_eq!(out, "PO: soup\n");
    }

    #[test]
    fn test_sunday_slice_runs_to_end() {
        let entity = Entity::new("a");
        let ctx = monday_ctx(&entity);
        let menu = "Saturday\nbrunch\nSunday\nroast\n";
        let out = DayCutFilter::with_range(6, None).apply(menu, &ctx).unwrap();
        assert_eq!(out, "Sunday\nroast\n");
    }

    #[test]
    fn test_skip_flag_passes_through() {
        let entity = Entity::new("a");
        let mut ctx = monday_ctx(&entity);
        ctx.skip_day_filter = true;
        let out = DayCutFilter::new().apply(WEEK_MENU, &ctx).unwrap();
        assert_eq!(out, WEEK_MENU);
    }
}
