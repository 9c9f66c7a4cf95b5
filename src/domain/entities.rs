use std::collections::HashMap;

/// Identifier for types in the static data export. Items, groups,
/// categories and blueprints all live in the same id space, and every
/// lookup table in the program is keyed by this one type.
pub type TypeId = u32;

/// Daily-volume value meaning "unknown, do not filter this item out".
pub const UNKNOWN_VOLUME: f64 = 999_999.0;

/// Static attributes of one item type.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemInfo {
    pub name: String,
    /// Physical volume in m3.
    pub volume: f64,
    pub group_id: TypeId,
}

/// The production graph and type attributes, loaded once per run and
/// never mutated afterwards.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub types: HashMap<TypeId, ItemInfo>,
    /// groupID -> categoryID.
    pub group_categories: HashMap<TypeId, TypeId>,
    /// productTypeID -> blueprint typeID (manufacturing activity only).
    pub product_blueprints: HashMap<TypeId, TypeId>,
    /// productTypeID -> units produced per blueprint run.
    pub output_quantities: HashMap<TypeId, i64>,
    /// blueprint typeID -> (materialTypeID, quantity per run).
    pub blueprint_materials: HashMap<TypeId, Vec<(TypeId, f64)>>,
}

impl Catalog {
    pub fn item(&self, id: TypeId) -> Option<&ItemInfo> {
        self.types.get(&id)
    }

    /// Category of the group an item belongs to, if both lookups resolve.
    pub fn category_of(&self, id: TypeId) -> Option<TypeId> {
        let info = self.types.get(&id)?;
        self.group_categories.get(&info.group_id).copied()
    }

    pub fn blueprint_for(&self, product: TypeId) -> Option<TypeId> {
        self.product_blueprints.get(&product).copied()
    }

    pub fn materials(&self, blueprint: TypeId) -> &[(TypeId, f64)] {
        self.blueprint_materials
            .get(&blueprint)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Units produced per run. Defaults to 1 when the dataset has no row;
    /// a recorded 0 is surfaced as-is so the resolver can reject it.
    pub fn output_quantity(&self, product: TypeId) -> i64 {
        self.output_quantities.get(&product).copied().unwrap_or(1)
    }
}

/// Frozen per-run view of the market. Assembled once before resolution
/// starts; the resolver never sees a price change mid-run.
#[derive(Clone, Debug, Default)]
pub struct MarketSnapshot {
    prices: HashMap<TypeId, f64>,
    volumes: HashMap<TypeId, f64>,
}

impl MarketSnapshot {
    pub fn new(prices: HashMap<TypeId, f64>, volumes: HashMap<TypeId, f64>) -> Self {
        Self { prices, volumes }
    }

    /// Minimum sell price, 0.0 when the market knows nothing about the id.
    pub fn price(&self, id: TypeId) -> f64 {
        self.prices.get(&id).copied().unwrap_or(0.0)
    }

    /// Average daily traded volume. Unknown ids report [`UNKNOWN_VOLUME`]
    /// so that missing data never filters an item out.
    pub fn daily_volume(&self, id: TypeId) -> f64 {
        self.volumes.get(&id).copied().unwrap_or(UNKNOWN_VOLUME)
    }
}

/// Tunables for one analysis run.
#[derive(Clone, Debug)]
pub struct ScanConfig {
    pub region_id: TypeId,
    /// Costs in the report are scaled to this many units to reduce
    /// rounding noise on cheap items.
    pub units_to_compare: u32,
    /// Treat minerals and planetary commodities as self-supplied (free in
    /// ISK, paid in hours) instead of bought.
    pub self_sufficient: bool,
    pub include_blueprint_cost: bool,
    /// Runs the blueprint price is amortized over.
    pub blueprint_runs: i64,
    pub min_daily_volume: f64,
    pub exclude_tech2: bool,
    pub reprocessing_efficiency: f64,
    pub miner_cycle_seconds: f64,
    /// Ore units yielded per miner cycle before reprocessing losses.
    pub ore_units_per_cycle: f64,
    /// Flat hours per unit of planetary input.
    pub pi_hours_per_unit: f64,
    pub volume_window_days: u32,
    /// Drop candidates whose blueprint has no discoverable market price
    /// instead of amortizing a zero cost.
    pub skip_unpriced_blueprints: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            region_id: 10_000_002, // The Forge (Jita)
            units_to_compare: 10,
            self_sufficient: true,
            include_blueprint_cost: true,
            blueprint_runs: 4000,
            min_daily_volume: 5.0,
            exclude_tech2: true,
            reprocessing_efficiency: 0.72,
            miner_cycle_seconds: 180.0,
            ore_units_per_cycle: 1.0,
            pi_hours_per_unit: 0.01,
            volume_window_days: 30,
            skip_unpriced_blueprints: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_defaults_never_filter_or_pay() {
        let snapshot = MarketSnapshot::new(
            HashMap::from([(34, 5.5)]),
            HashMap::from([(34, 120.0)]),
        );

        assert_eq!(snapshot.price(34), 5.5);
        assert_eq!(snapshot.daily_volume(34), 120.0);
        // Unknown ids: free to buy nothing, too liquid to filter.
        assert_eq!(snapshot.price(999), 0.0);
        assert_eq!(snapshot.daily_volume(999), UNKNOWN_VOLUME);
    }

    #[test]
    fn output_quantity_defaults_to_one_but_preserves_zero() {
        let mut catalog = Catalog::default();
        catalog.output_quantities.insert(600, 0);

        assert_eq!(catalog.output_quantity(601), 1);
        assert_eq!(catalog.output_quantity(600), 0);
    }
}
