//! Candidate filtering, cost resolution and profitability ranking.

use serde::Serialize;
use tracing::debug;

use super::classify::ClassRules;
use super::cost::{CostResolver, IntegrityError};
use super::entities::{Catalog, MarketSnapshot, ScanConfig, TypeId};

/// One fully evaluated candidate. Monetary and hour fields are scaled to
/// the configured comparison unit count.
#[derive(Clone, Debug, Serialize)]
pub struct ReportRow {
    pub type_id: TypeId,
    pub name: String,
    pub volume_m3: f64,
    pub build_cost: f64,
    pub blueprint_cost: f64,
    pub blueprint_price: f64,
    pub total_cost: f64,
    pub sell_value: f64,
    pub profit: f64,
    pub daily_volume: f64,
    pub mining_hours: f64,
    pub pi_hours: f64,
    pub total_hours: f64,
    pub isk_per_hour: f64,
}

/// Ranked rows plus counts of what the filters dropped.
#[derive(Debug, Default)]
pub struct RankingOutcome {
    pub rows: Vec<ReportRow>,
    pub below_volume: usize,
    pub unpriced_blueprints: usize,
}

/// Evaluates every candidate against the frozen snapshot and sorts the
/// survivors by ISK per hour, best first. Integrity violations abort the
/// whole run; filter hits are counted, not errors.
pub fn rank_candidates(
    catalog: &Catalog,
    market: &MarketSnapshot,
    config: &ScanConfig,
    rules: ClassRules,
    candidates: &[TypeId],
) -> Result<RankingOutcome, IntegrityError> {
    let mut resolver = CostResolver::new(catalog, market, config, rules);
    let mut outcome = RankingOutcome::default();
    let units = f64::from(config.units_to_compare);

    for (index, &id) in candidates.iter().enumerate() {
        if index % 100 == 0 {
            debug!("{index}/{} candidates evaluated", candidates.len());
        }

        let daily_volume = market.daily_volume(id);
        if daily_volume < config.min_daily_volume {
            outcome.below_volume += 1;
            continue;
        }

        if config.skip_unpriced_blueprints {
            let unpriced = catalog
                .blueprint_for(id)
                .map(|blueprint| market.price(blueprint) <= 0.0)
                .unwrap_or(false);
            if unpriced {
                outcome.unpriced_blueprints += 1;
                continue;
            }
        }

        let item = catalog
            .item(id)
            .ok_or(IntegrityError::UnknownItem { item: id })?;
        let cost = resolver.resolve(id)?;

        let build_cost = cost.build_cost * units;
        let blueprint_cost = cost.blueprint_amortized * units;
        let mining_hours = cost.mining_hours * units;
        let pi_hours = cost.planetary_hours * units;

        let sell_value = market.price(id) * units;
        let total_cost = build_cost + blueprint_cost;
        let profit = sell_value - total_cost;
        let total_hours = mining_hours + pi_hours;
        let isk_per_hour = if total_hours > 0.0 {
            profit / total_hours
        } else {
            0.0
        };

        outcome.rows.push(ReportRow {
            type_id: id,
            name: item.name.clone(),
            volume_m3: item.volume,
            build_cost,
            blueprint_cost,
            blueprint_price: cost.blueprint_price,
            total_cost,
            sell_value,
            profit,
            daily_volume,
            mining_hours,
            pi_hours,
            total_hours,
            isk_per_hour,
        });
    }

    outcome.rows.sort_by(|a, b| {
        b.isk_per_hour
            .partial_cmp(&a.isk_per_hour)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(outcome)
}
