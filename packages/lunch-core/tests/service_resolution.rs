//! End-to-end resolution tests over the service, with injected mock
//! resolvers instead of live HTTP.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;
use lunch_core::testing::{AppendResolver, FailingResolver, SequenceResolver};
use lunch_core::{
    AppConfig, ChainStep, Entity, LunchService, Registry, ResolveOptions, SelectOptions,
    ZOMATO_NOT_CONFIGURED,
};

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
}

fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
}

fn service_with(cache_dir: &std::path::Path, registry: Registry) -> LunchService {
    LunchService::new(AppConfig::with_cache_dir(cache_dir), registry)
}

#[tokio::test]
async fn same_day_resolution_is_memoized() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new();
    registry.register(Entity::new("nepal").with_resolver("seq"), false);

    let mut service = service_with(dir.path(), registry);
    let seq = SequenceResolver::new("seq", vec!["menu v1".into(), "menu v2".into()]);
    let calls = seq.calls();
    service.resolvers_mut().register(Arc::new(seq));

    let entity = service.instances().get("nepal").unwrap().clone();
    let options = ResolveOptions::new().on_day(monday());

    let first = service.resolve_text(&entity, &options).await;
    let second = service.resolve_text(&entity, &options).await;

    assert_eq!(first.as_deref(), Some("menu v1"));
    assert_eq!(second.as_deref(), Some("menu v1"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn day_rollover_triggers_fresh_resolve() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new();
    registry.register(Entity::new("nepal").with_resolver("seq"), false);

    let mut service = service_with(dir.path(), registry);
    let seq = SequenceResolver::new("seq", vec!["menu v1".into(), "menu v2".into()]);
    let calls = seq.calls();
    service.resolvers_mut().register(Arc::new(seq));

    let entity = service.instances().get("nepal").unwrap().clone();

    let on_monday = service
        .resolve_text(&entity, &ResolveOptions::new().on_day(monday()))
        .await;
    let on_tuesday = service
        .resolve_text(&entity, &ResolveOptions::new().on_day(tuesday()))
        .await;

    assert_eq!(on_monday.as_deref(), Some("menu v1"));
    assert_eq!(on_tuesday.as_deref(), Some("menu v2"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn chain_threads_content_between_steps() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new();
    registry.register(
        Entity::new("chained")
            .with_chain_step(ChainStep::new("first"))
            .with_chain_step(ChainStep::new("appender")),
        false,
    );

    let mut service = service_with(dir.path(), registry);
    service
        .resolvers_mut()
        .register(Arc::new(SequenceResolver::new("first", vec!["X".into()])));
    service
        .resolvers_mut()
        .register(Arc::new(AppendResolver::new("appender", "-Y")));

    let entity = service.instances().get("chained").unwrap().clone();
    let text = service
        .resolve_text(&entity, &ResolveOptions::new().on_day(monday()))
        .await;
    assert_eq!(text.as_deref(), Some("X-Y"));
}

#[tokio::test]
async fn chain_skips_unknown_step_resolver() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new();
    registry.register(
        Entity::new("half-chained")
            .with_chain_step(ChainStep::new("no-such-resolver"))
            .with_chain_step(ChainStep::new("appender")),
        false,
    );

    let mut service = service_with(dir.path(), registry);
    service
        .resolvers_mut()
        .register(Arc::new(AppendResolver::new("appender", "-Y")));

    let entity = service.instances().get("half-chained").unwrap().clone();
    let text = service
        .resolve_text(&entity, &ResolveOptions::new().on_day(monday()))
        .await;
    // Step 2 alone, on absent input.
    assert_eq!(text.as_deref(), Some("-Y"));
}

#[tokio::test]
async fn chain_keeps_content_when_step_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new();
    registry.register(
        Entity::new("sturdy")
            .with_chain_step(ChainStep::new("first"))
            .with_chain_step(ChainStep::new("broken")),
        false,
    );

    let mut service = service_with(dir.path(), registry);
    service
        .resolvers_mut()
        .register(Arc::new(SequenceResolver::new("first", vec!["X".into()])));
    service
        .resolvers_mut()
        .register(Arc::new(FailingResolver::new("broken")));

    let entity = service.instances().get("sturdy").unwrap().clone();
    let text = service
        .resolve_text(&entity, &ResolveOptions::new().on_day(monday()))
        .await;
    assert_eq!(text.as_deref(), Some("X"));
}

#[tokio::test]
async fn day_filter_slices_today_and_full_skips_it() {
    const WEEK_MENU: &str = "Monday\nsoup A\nTuesday\nsoup B\nWednesday\nsoup C";

    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new();
    registry.register(
        Entity::new("weekly").with_resolver("week").with_filter("day"),
        false,
    );

    let mut service = service_with(dir.path(), registry);
    service
        .resolvers_mut()
        .register(Arc::new(SequenceResolver::new(
            "week",
            vec![WEEK_MENU.into()],
        )));

    let entity = service.instances().get("weekly").unwrap().clone();

    let sliced = service
        .resolve_text(&entity, &ResolveOptions::new().on_day(monday()))
        .await;
    assert_eq!(sliced.as_deref(), Some("Monday\nsoup A\n"));

    let full = service
        .resolve_text(&entity, &ResolveOptions::new().on_day(monday()).full())
        .await;
    assert_eq!(full.as_deref(), Some(WEEK_MENU));

    let unfiltered = service
        .resolve_text(
            &entity,
            &ResolveOptions::new().on_day(monday()).skip_filters(),
        )
        .await;
    assert_eq!(unfiltered.as_deref(), Some(WEEK_MENU));
}

#[tokio::test]
async fn failed_resolution_is_absent_and_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new();
    registry.register(Entity::new("flaky").with_resolver("flaky-seq"), false);

    let mut service = service_with(dir.path(), registry);
    let seq = SequenceResolver::new("flaky-seq", Vec::new());
    service.resolvers_mut().register(Arc::new(seq));

    let entity = service.instances().get("flaky").unwrap().clone();
    let text = service
        .resolve_text(&entity, &ResolveOptions::new().on_day(monday()))
        .await;
    assert!(text.is_none());
    assert!(service.cache().list_day(monday()).await.unwrap().is_empty());
}

#[tokio::test]
async fn zomato_without_key_reports_setup_hint() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new();
    registry.register(
        Entity::new("zomato-place").with_resolver("zomato").with_selector("12345"),
        false,
    );

    let service = service_with(dir.path(), registry);
    let entity = service.instances().get("zomato-place").unwrap().clone();
    let text = service
        .resolve_text(&entity, &ResolveOptions::new().on_day(monday()))
        .await;
    assert_eq!(text.as_deref(), Some(ZOMATO_NOT_CONFIGURED));
}

#[tokio::test]
async fn batch_resolution_preserves_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new();
    for name in ["alpha", "beta", "gamma"] {
        registry.register(Entity::new(name).with_resolver(format!("seq-{name}")), false);
    }

    let mut service = service_with(dir.path(), registry);
    for name in ["alpha", "beta", "gamma"] {
        service.resolvers_mut().register(Arc::new(
            SequenceResolver::new(format!("seq-{name}"), vec![format!("menu of {name}")]),
        ));
    }

    let service = Arc::new(service);
    let entities = service
        .select_instances(&[], SelectOptions::new())
        .unwrap();
    let results = service
        .resolve_many(entities, ResolveOptions::new().on_day(monday()))
        .await;

    let names: Vec<&str> = results.iter().map(|(e, _)| e.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    for (entity, text) in &results {
        assert_eq!(text.as_deref(), Some(format!("menu of {}", entity.name).as_str()));
    }
}

#[tokio::test]
async fn selection_drops_disabled_unless_included() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new();
    registry.register(Entity::new("open-place").with_tags(["pizza"]), false);
    registry.register(Entity::new("closed-place").with_tags(["pizza"]).disabled(), false);

    let service = service_with(dir.path(), registry);

    let default = service.select_instances(&[], SelectOptions::new()).unwrap();
    assert_eq!(default.len(), 1);
    assert_eq!(default[0].name, "open-place");

    let by_exact_name = service
        .select_instances(
            &["closed-place".to_string()],
            SelectOptions::new().include_disabled(),
        )
        .unwrap();
    assert_eq!(by_exact_name.len(), 1);
    assert_eq!(by_exact_name[0].name, "closed-place");

    let by_tags = service
        .select_instances(&["pizza".to_string()], SelectOptions::new().by_tags())
        .unwrap();
    assert_eq!(by_tags.len(), 1);
}

#[tokio::test]
async fn fuzzy_selection_finds_closest_name() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new();
    registry.register(Entity::new("pizza-house"), false);
    registry.register(Entity::new("sushi-bar"), false);

    let service = service_with(dir.path(), registry);
    let matched = service
        .select_instances(&["piza".to_string()], SelectOptions::new().fuzzy())
        .unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name, "pizza-house");
}

#[tokio::test]
async fn resolve_html_returns_prefilter_markup() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new();
    registry.register(Entity::new("markup-place").with_resolver("markup"), false);

    let mut service = service_with(dir.path(), registry);
    service
        .resolvers_mut()
        .register(Arc::new(SequenceResolver::new(
            "markup",
            vec!["<p>soup</p>".into()],
        )));

    let entity = service.instances().get("markup-place").unwrap().clone();
    let html = service
        .resolve_html(&entity, &ResolveOptions::new().on_day(monday()))
        .await;
    assert_eq!(html.as_deref(), Some("<p>soup</p>"));
}
