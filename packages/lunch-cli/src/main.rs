//! Command-line front end for the lunch resolution engine.
//!
//! Loads restaurant definitions from a YAML file, wires up the service
//! and exposes selection, resolution and cache maintenance commands.
//! Contains no resolution logic of its own.

mod loader;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lunch_core::{AppConfig, DayCache, LunchService, ResolveOptions, SelectOptions};

#[derive(Parser)]
#[command(name = "lunch", about = "Daily lunch-menu aggregator", version)]
struct Cli {
    /// Restaurant definition file
    #[arg(short, long, default_value = "restaurants.yml", global = true)]
    restaurants: PathBuf,

    /// Cache directory (defaults to the system temp dir)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Disable the day cache for this invocation
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List all registered restaurants
    List,

    /// Resolve and print menus
    Menu {
        /// Restaurant names (or tag tokens with --tags); empty selects all
        selectors: Vec<String>,

        /// Treat selectors as one boolean tag expression
        #[arg(short, long)]
        tags: bool,

        /// Fuzzy-match selector names
        #[arg(short, long)]
        fuzzy: bool,

        /// Include disabled restaurants
        #[arg(long)]
        include_disabled: bool,

        /// Print the whole menu instead of today's slice
        #[arg(long)]
        full: bool,

        /// Skip the filter pipeline entirely
        #[arg(long)]
        raw: bool,

        /// Resolve for an explicit day (YYYY-MM-DD) instead of today
        #[arg(long)]
        day: Option<NaiveDate>,
    },

    /// Print the known tag universe
    Tags,

    /// Cache maintenance
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// List cached artifacts for a day
    List {
        #[arg(long)]
        day: Option<NaiveDate>,
    },

    /// Clear cached artifacts; with names, only those restaurants'
    Clear {
        names: Vec<String>,

        #[arg(long)]
        day: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let service = Arc::new(build_service(&cli)?);

    match cli.command {
        Command::List => {
            print!("{}", service.available_listing());
        }
        Command::Menu {
            selectors,
            tags,
            fuzzy,
            include_disabled,
            full,
            raw,
            day,
        } => {
            let mut select = SelectOptions::new();
            if tags {
                select = select.by_tags();
            }
            if fuzzy {
                select = select.fuzzy();
            }
            if include_disabled {
                select = select.include_disabled();
            }

            let selected = service
                .select_instances(&selectors, select)
                .context("selection failed")?;
            if selected.is_empty() {
                println!("**No instance has been found**");
                return Ok(());
            }

            let mut options = ResolveOptions::new();
            if full {
                options = options.full();
            }
            if raw {
                options = options.skip_filters();
            }
            if let Some(day) = day {
                options = options.on_day(day);
            }

            for (entity, text) in service.resolve_many(selected, options).await {
                let url = entity.url.as_deref().unwrap_or("-");
                println!("Restaurant: \"{}\" - {}", entity.display_label(), url);
                match text {
                    Some(text) => println!("{text}\n"),
                    None => println!("**No content available**\n"),
                }
            }
        }
        Command::Tags => {
            for tag in service.instances().all_tags() {
                println!("{tag}");
            }
        }
        Command::Cache { command } => match command {
            CacheCommand::List { day } => {
                let day = day.unwrap_or_else(DayCache::today);
                for name in service.cache().list_day(day).await? {
                    println!("{name}");
                }
            }
            CacheCommand::Clear { names, day } => {
                let day = day.unwrap_or_else(DayCache::today);
                let removed = service.cache().clear(&names, day).await?;
                for path in removed {
                    println!("removed {}", path.display());
                }
            }
        },
    }

    Ok(())
}

fn build_service(cli: &Cli) -> Result<LunchService> {
    let mut config = match &cli.cache_dir {
        Some(dir) => AppConfig::with_cache_dir(dir),
        None => AppConfig::default(),
    };
    if cli.no_cache {
        config.cache_enabled = false;
    }
    if let Ok(key) = std::env::var("LUNCH_ZOMATO_API_KEY") {
        if !key.is_empty() {
            config.zomato_api_key = Some(key);
        }
    }

    let registry = loader::load_registry(&cli.restaurants)?;
    Ok(LunchService::new(config, registry))
}
