//! Discovery command-line browser
//!
//! Loads listings through the same collections and views the data layer
//! uses, one page at a time.

mod args;
mod output;

use anyhow::{Context, Result};
use args::Query;
use clap::ArgMatches;
use discovery_api::{ApiConfig, DiscoveryClient, DiscoveryDataLayer, EntityKind};
use discovery_collection::{Collection, Entity, ViewOptions};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    let matches = args::cli().get_matches();
    init_logging(&matches);

    if let Err(err) = run(&matches).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_logging(matches: &ArgMatches) {
    let level = matches
        .get_one::<String>("log-level")
        .map_or("info", String::as_str);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match matches.get_one::<String>("log-format").map(String::as_str) {
        Some("json") => fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        _ => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

fn load_config(matches: &ArgMatches) -> Result<ApiConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ApiConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => ApiConfig::default(),
    };
    if let Some(base_url) = matches.get_one::<String>("base-url") {
        config = config.with_base_url(base_url);
    }
    debug!(?config, "configuration loaded");
    Ok(config)
}

/// What to print for a listing
#[derive(Debug, Clone, Copy)]
enum Action {
    Page(usize),
    Ids,
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;

    let (action, query) = match matches.subcommand() {
        Some(("page", args)) => {
            let page = args.get_one::<usize>("page").copied().unwrap_or(0);
            (Action::Page(page), Query::from_matches(args))
        }
        Some(("ids", args)) => (Action::Ids, Query::from_matches(args)),
        _ => anyhow::bail!("no subcommand given"),
    };

    let page_size = query.page_size.unwrap_or(config.page_size);
    let client = DiscoveryClient::new(config).context("failed to create API client")?;
    let layer = DiscoveryDataLayer::new(query.domain, client);
    info!(kind = %query.kind, domain = %query.domain, page_size, "browsing listing");

    match query.kind {
        EntityKind::Samples => show(&layer.samples, &query, page_size, action).await,
        EntityKind::Projects => show(&layer.projects, &query, page_size, action).await,
        EntityKind::Visualizations => {
            show(&layer.visualizations, &query, page_size, action).await
        }
        EntityKind::WorkflowRuns => {
            show(&layer.amr_workflow_runs, &query, page_size, action).await
        }
    }
}

async fn show<T>(
    collection: &Collection<T>,
    query: &Query,
    page_size: usize,
    action: Action,
) -> Result<()>
where
    T: Entity + Serialize,
{
    let view = collection.create_view(
        ViewOptions::new()
            .with_page_size(page_size)
            .with_conditions(query.conditions.clone()),
    );

    match action {
        Action::Page(page) => {
            let rows = view
                .load_page(page)
                .await
                .with_context(|| format!("failed to load {} page {page}", query.kind))?;
            let rendered = if query.json {
                output::page_json(page, page_size, view.len(), &rows)?
            } else {
                output::page_text(page, page_size, view.len(), &rows)
            };
            print!("{rendered}");
            if query.json {
                println!();
            }
        }
        Action::Ids => {
            view.load_page(0)
                .await
                .with_context(|| format!("failed to list {} ids", query.kind))?;
            let ids = view.ids();
            if query.json {
                println!("{}", output::ids_json(&ids)?);
            } else {
                print!("{}", output::ids_text(&ids));
            }
        }
    }
    Ok(())
}
