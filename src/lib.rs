pub mod cli;
pub mod config;
pub mod db;
pub mod models;
pub mod normalize;
pub mod scraping;
pub mod utils;

use std::path::Path;

use anyhow::{Context, Result};

use cli::Cli;
use config::AppConfig;
use db::Store;
use models::RawEventFields;
use normalize::{LocationTable, Normalizer, TagTable};
use scraping::ScrapeOptions;

/// Resolves configuration from the file, the environment and the command
/// line, in increasing priority.
pub fn resolve_config(cli: &Cli, config_path: &Path) -> Result<AppConfig> {
    let mut config = AppConfig::load(config_path)
        .with_context(|| format!("unable to load config {config_path:?}"))?
        .apply_env();
    if let Some(db) = &cli.db {
        config.database_path = Some(db.clone());
    }
    if let Some(output) = &cli.output {
        config.output_path = Some(output.clone());
    }
    Ok(config)
}

pub fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(utils::config_path);
    let config = resolve_config(&cli, &config_path)?;

    if cli.init_config {
        config.save(&config_path)?;
        log::info!("Wrote configuration to {}", config_path.display());
        return Ok(());
    }

    let sources = scraping::active_sources(&config);
    if cli.sources {
        let infos = scraping::list_sources(&sources);
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    let db_path = config.database_path();
    let mut store =
        Store::open(&db_path).with_context(|| format!("unable to open database {db_path:?}"))?;

    if cli.list {
        let events = store.list_events().context("unable to list stored events")?;
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    let tags = TagTable::load(config.tag_map_path.as_deref())?;
    let locations = LocationTable::load(config.location_map_path.as_deref())?;
    let normalizer = Normalizer::new(tags, locations, config.reference_date()?);
    log::debug!("Inferring missing years from {}", normalizer.reference());

    let options = ScrapeOptions {
        pages: cli.pages.unwrap_or(1),
        retry: config.retry_policy(),
    };
    let raws = match cli.source.as_deref() {
        Some(id) => scraping::run_single(&sources, id, &options)?,
        None => scraping::run_all(&sources, &options)?,
    };

    let stored = persist_events(
        &normalizer,
        &raws,
        &mut store,
        config.output_path.as_deref(),
        cli.append,
    )?;
    log::info!("Saved {stored} events to {}", db_path.display());
    Ok(())
}

/// Normalizes scraped records, upserts them and optionally exports them.
/// Returns how many events the store accepted.
pub fn persist_events(
    normalizer: &Normalizer,
    raws: &[RawEventFields],
    store: &mut Store,
    output: Option<&Path>,
    append: bool,
) -> Result<usize> {
    let events = normalizer.assemble_all(raws);
    log::info!(
        "Normalized {} scraped records into {} events.",
        raws.len(),
        events.len()
    );
    if events.is_empty() {
        return Ok(0);
    }

    let stored = store
        .upsert_events(&events)
        .context("failed to persist events")?;

    if let Some(path) = output {
        let written = utils::save_json(path, &events, append)?;
        log::info!("Wrote {written} events to {}", path.display());
    }
    Ok(stored)
}
