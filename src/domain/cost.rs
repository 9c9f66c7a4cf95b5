//! Recursive build-cost resolution over the production graph.
//!
//! - Resolves a five-field cost vector per item, memoized for the run.
//! - Breaks recipe cycles by falling back to the raw market price.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::classify::{classify, ClassRules, Classification};
use super::entities::{Catalog, MarketSnapshot, ScanConfig, TypeId};

/// Malformed catalog data that makes a cost impossible to state. Fatal:
/// the run aborts rather than reporting a partial vector.
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("item {item}: blueprint output quantity is recorded as {quantity}")]
    InvalidOutputQuantity { item: TypeId, quantity: i64 },
    #[error("item {item}: material {material} has negative quantity {quantity}")]
    NegativeMaterialQuantity {
        item: TypeId,
        material: TypeId,
        quantity: f64,
    },
    #[error("candidate {item} is missing from the type catalog")]
    UnknownItem { item: TypeId },
}

/// Per-unit cost of obtaining one item, split by how the cost is paid.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CostVector {
    /// ISK spent on purchased inputs.
    pub build_cost: f64,
    /// Hours mining self-supplied minerals.
    pub mining_hours: f64,
    /// Hours producing self-supplied planetary commodities.
    pub planetary_hours: f64,
    /// Blueprint price spread over the configured run count.
    pub blueprint_amortized: f64,
    /// Full one-time price of the item's own blueprint.
    pub blueprint_price: f64,
}

impl CostVector {
    fn market(price: f64) -> Self {
        Self {
            build_cost: price,
            ..Self::default()
        }
    }
}

/// Walks the item -> blueprint -> materials graph and accumulates cost
/// vectors, memoizing each item for the lifetime of one run. Holds the
/// frozen market snapshot, so repeated resolutions are bit-identical.
pub struct CostResolver<'a> {
    catalog: &'a Catalog,
    market: &'a MarketSnapshot,
    config: &'a ScanConfig,
    rules: ClassRules,
    cache: HashMap<TypeId, CostVector>,
    /// Items currently on the resolution stack; membership means a cycle.
    in_progress: HashSet<TypeId>,
}

impl<'a> CostResolver<'a> {
    pub fn new(
        catalog: &'a Catalog,
        market: &'a MarketSnapshot,
        config: &'a ScanConfig,
        rules: ClassRules,
    ) -> Self {
        Self {
            catalog,
            market,
            config,
            rules,
            cache: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    /// Per-unit cost vector for `id`. Either fully succeeds (possibly via
    /// market-price fallbacks for unreachable data) or reports the
    /// integrity violation that stopped it.
    pub fn resolve(&mut self, id: TypeId) -> Result<CostVector, IntegrityError> {
        if let Some(cached) = self.cache.get(&id) {
            return Ok(*cached);
        }

        self.in_progress.insert(id);
        let result = self.resolve_uncached(id);
        // Must come off the stack even when resolution failed, or every
        // later resolution touching this id would see a phantom cycle.
        self.in_progress.remove(&id);

        let vector = result?;
        self.cache.insert(id, vector);
        Ok(vector)
    }

    fn resolve_uncached(&mut self, id: TypeId) -> Result<CostVector, IntegrityError> {
        let catalog = self.catalog;
        let Some(blueprint) = catalog.blueprint_for(id) else {
            return Ok(self.leaf_cost(id));
        };

        let mut total = CostVector::default();

        for &(material, quantity) in catalog.materials(blueprint) {
            if quantity < 0.0 {
                return Err(IntegrityError::NegativeMaterialQuantity {
                    item: id,
                    material,
                    quantity,
                });
            }

            if self.config.self_sufficient {
                match classify(catalog, &self.rules, material) {
                    Classification::Mineral => {
                        total.mining_hours += self.gather_hours(quantity);
                        continue;
                    }
                    Classification::Planetary => {
                        total.planetary_hours += quantity * self.config.pi_hours_per_unit;
                        continue;
                    }
                    _ => {}
                }
            }

            let sub = self.resolve_material(material)?;
            total.build_cost += sub.build_cost * quantity;
            total.mining_hours += sub.mining_hours * quantity;
            total.planetary_hours += sub.planetary_hours * quantity;
            // The amortized share scales with quantity; the one-time
            // purchase price of sub-blueprints does not roll up.
            total.blueprint_amortized += sub.blueprint_amortized * quantity;
        }

        let blueprint_price = self.market.price(blueprint);
        if self.config.include_blueprint_cost && self.config.blueprint_runs > 0 {
            total.blueprint_amortized += blueprint_price / self.config.blueprint_runs as f64;
        }
        total.blueprint_price += blueprint_price;

        let output_quantity = catalog.output_quantity(id);
        if output_quantity <= 0 {
            return Err(IntegrityError::InvalidOutputQuantity {
                item: id,
                quantity: output_quantity,
            });
        }
        if output_quantity != 1 {
            let per_run = output_quantity as f64;
            total.build_cost /= per_run;
            total.mining_hours /= per_run;
            total.planetary_hours /= per_run;
            total.blueprint_amortized /= per_run;
            total.blueprint_price /= per_run;
        }

        Ok(total)
    }

    /// Recursion guard. A material already on the stack is priced off the
    /// market instead of recursed into; that fallback is deliberately not
    /// memoized, so a later acyclic path can still compute the real value.
    fn resolve_material(&mut self, material: TypeId) -> Result<CostVector, IntegrityError> {
        if self.in_progress.contains(&material) {
            return Ok(CostVector::market(self.market.price(material)));
        }
        self.resolve(material)
    }

    /// Cost of an item with no blueprint. Gather time for minerals is a
    /// function of consumed quantity, so it accrues at the usage site;
    /// here a mineral is simply free.
    fn leaf_cost(&self, id: TypeId) -> CostVector {
        if self.config.self_sufficient {
            match classify(self.catalog, &self.rules, id) {
                Classification::Mineral => return CostVector::default(),
                Classification::Planetary => {
                    return CostVector {
                        planetary_hours: self.config.pi_hours_per_unit,
                        ..CostVector::default()
                    }
                }
                _ => {}
            }
        }
        CostVector::market(self.market.price(id))
    }

    fn gather_hours(&self, quantity: f64) -> f64 {
        let cycles = quantity
            / (self.config.reprocessing_efficiency * self.config.ore_units_per_cycle);
        cycles * self.config.miner_cycle_seconds / 3600.0
    }
}
