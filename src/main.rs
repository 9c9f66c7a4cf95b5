//! Industry profit scanner.
//!
//! Computes the recursive build cost of every manufacturable item in the
//! static data export, compares it against market sell prices, and ranks
//! the results by ISK per producer hour.

mod domain;
mod infra;
mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::domain::{rank_candidates, ClassRules, MarketSnapshot, ScanConfig, TypeId};
use crate::infra::{cache, market::MarketClient, sde};

#[derive(Parser)]
#[command(name = "industry-profit-scanner")]
#[command(about = "Ranks manufacturable items by ISK per producer hour")]
struct Cli {
    /// Path to the SDE SQLite database
    #[arg(short, long, default_value = "sqlite-latest.sqlite")]
    database: PathBuf,

    /// Output CSV path
    #[arg(short, long, default_value = "industry_profit_report.csv")]
    output: PathBuf,

    /// Market region to price against (10000002 = The Forge)
    #[arg(long, default_value_t = 10_000_002)]
    region: TypeId,

    /// Number of units costs are compared for
    #[arg(long, default_value_t = 10)]
    units: u32,

    /// Treat minerals and planetary commodities as self-supplied
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    self_sufficient: bool,

    /// Amortize blueprint prices into the build cost
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    blueprint_cost: bool,

    /// Runs a blueprint price is amortized over
    #[arg(long, default_value_t = 4000)]
    blueprint_runs: i64,

    /// Skip items trading fewer units per day than this
    #[arg(long, default_value_t = 5.0)]
    min_daily_volume: f64,

    /// Exclude tech-2 items (names ending in " II")
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    exclude_tech2: bool,

    /// Reprocessing efficiency applied to mining time
    #[arg(long, default_value_t = 0.72)]
    reprocessing_efficiency: f64,

    /// Seconds per miner cycle
    #[arg(long, default_value_t = 180.0)]
    miner_cycle_seconds: f64,

    /// Ore units yielded per miner cycle
    #[arg(long, default_value_t = 1.0)]
    ore_units_per_cycle: f64,

    /// Flat hours per unit of planetary input
    #[arg(long, default_value_t = 0.01)]
    pi_hours_per_unit: f64,

    /// Lookback window for daily-volume averages, in days
    #[arg(long, default_value_t = 30)]
    volume_window_days: u32,

    /// Refetch volume history even when a cache exists
    #[arg(long)]
    regenerate_volumes: bool,

    /// Drop candidates whose blueprint has no market price
    #[arg(long)]
    skip_unpriced_blueprints: bool,

    /// Rows shown in each console table
    #[arg(long, default_value_t = 20)]
    rows: usize,
}

impl Cli {
    fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            region_id: self.region,
            units_to_compare: self.units,
            self_sufficient: self.self_sufficient,
            include_blueprint_cost: self.blueprint_cost,
            blueprint_runs: self.blueprint_runs,
            min_daily_volume: self.min_daily_volume,
            exclude_tech2: self.exclude_tech2,
            reprocessing_efficiency: self.reprocessing_efficiency,
            miner_cycle_seconds: self.miner_cycle_seconds,
            ore_units_per_cycle: self.ore_units_per_cycle,
            pi_hours_per_unit: self.pi_hours_per_unit,
            volume_window_days: self.volume_window_days,
            skip_unpriced_blueprints: self.skip_unpriced_blueprints,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.scan_config();

    info!("loading static data from {}", cli.database.display());
    let conn = sde::open(&cli.database)
        .with_context(|| format!("failed to open SDE database {}", cli.database.display()))?;
    let catalog = sde::load_catalog(&conn).context("failed to load the static data export")?;
    let candidates = sde::manufacturable_candidates(&conn, config.exclude_tech2)
        .context("failed to enumerate manufacturable candidates")?;
    info!("found {} manufacturable candidates", candidates.len());

    let client =
        MarketClient::new(config.region_id).context("failed to build the market client")?;

    // Price everything resolution can touch: the candidates themselves,
    // every blueprint, and every blueprint material.
    let mut price_ids: Vec<TypeId> = candidates.clone();
    price_ids.extend(catalog.product_blueprints.values().copied());
    price_ids.extend(
        catalog
            .blueprint_materials
            .values()
            .flatten()
            .map(|&(material, _)| material),
    );
    price_ids.sort_unstable();
    price_ids.dedup();
    let prices = client.preload_prices(&price_ids).await?;

    let cached = if cli.regenerate_volumes {
        None
    } else {
        cache::load_volume_cache(config.volume_window_days)
    };
    let volumes = match cached {
        Some(cache) => cache.volumes,
        None => {
            let fresh = client
                .fetch_volumes(&candidates, config.volume_window_days)
                .await?;
            let snapshot = cache::VolumeCache::new(config.volume_window_days, fresh.clone());
            if let Err(error) = cache::save_volume_cache(&snapshot) {
                warn!("failed to save volume cache: {error}");
            }
            fresh
        }
    };

    let market = MarketSnapshot::new(prices, volumes);
    let outcome = rank_candidates(
        &catalog,
        &market,
        &config,
        ClassRules::default(),
        &candidates,
    )
    .context("cost resolution aborted on a catalog integrity error")?;

    if outcome.below_volume > 0 {
        info!(
            "{} candidates dropped below the daily-volume floor of {}",
            outcome.below_volume, config.min_daily_volume
        );
    }
    if outcome.unpriced_blueprints > 0 {
        info!(
            "{} candidates dropped for unpriced blueprints",
            outcome.unpriced_blueprints
        );
    }

    if outcome.rows.is_empty() {
        println!("No items survived filtering; nothing to export.");
        return Ok(());
    }

    report::print_summary(&outcome.rows, cli.rows);
    report::write_csv(&cli.output, &outcome.rows)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    println!(
        "\nSaved {} rows to {}",
        outcome.rows.len(),
        cli.output.display()
    );

    Ok(())
}
