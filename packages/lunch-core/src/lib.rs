//! Lunch-menu resolution and caching engine.
//!
//! Aggregates daily lunch menus from heterogeneous sources (HTML pages,
//! PDFs, scanned images, the Zomato menu API) into normalized text,
//! memoized per calendar day and queryable by name or boolean tag
//! expression.
//!
//! # Architecture
//!
//! - [`tags`] - boolean tag-expression parser and evaluator
//! - [`entity`] - menu-source definitions and per-resolution views
//! - [`registry`] - named entity collection with exact/fuzzy/tag lookup
//! - [`resolvers`] - pluggable extraction strategies, composable via
//!   chains
//! - [`filters`] - post-resolution text transforms (cut, day-cut,
//!   newline collapse)
//! - [`cache`] - day-partitioned file memoization of resolver output
//! - [`service`] - the orchestrator wiring it all together
//! - [`testing`] - mock resolvers for tests
//!
//! # Usage
//!
//! ```rust,ignore
//! use lunch_core::{AppConfig, Entity, LunchService, Registry, ResolveOptions};
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     Entity::new("nepal")
//!         .with_url("https://nepal.example.com/menu")
//!         .with_selector("#daily-menu")
//!         .with_tags(["indian", "cheap"])
//!         .with_filter("day"),
//!     false,
//! );
//!
//! let service = LunchService::new(AppConfig::default(), registry);
//! let menu = service
//!     .resolve_text(service.instances().get("nepal").unwrap(), &ResolveOptions::new())
//!     .await;
//! ```

pub mod cache;
pub mod config;
pub mod entity;
pub mod error;
pub mod filters;
pub mod registry;
pub mod resolvers;
pub mod service;
pub mod tags;
pub mod testing;

pub use cache::{CacheKey, DayCache};
pub use config::AppConfig;
pub use entity::{ChainStep, Entity, ResolveOptions, ResolveRequest, DEFAULT_RESOLVER};
pub use error::{ConfigError, FetchError, LunchError, ParseError, Result};
pub use filters::{Filter, FilterContext};
pub use registry::{Registry, SelectOptions};
pub use resolvers::{Resolver, ResolverSet, ZOMATO_NOT_CONFIGURED};
pub use service::LunchService;
pub use tags::{TagEvaluator, TagExpr, TagExprError};
