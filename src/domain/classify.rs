//! Sorts item types into the buckets the cost resolver cares about.

use super::entities::{Catalog, TypeId};

/// How an item is obtained, derived from catalog data on every call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Mined ore product; free under self-sufficiency, paid in mining time.
    Mineral,
    /// Planetary-interaction commodity; free under self-sufficiency, paid
    /// in a flat per-unit time accrual.
    Planetary,
    /// Has a manufacturing blueprint.
    Manufacturable,
    /// Neither free nor buildable; bought off the market.
    MarketOnly,
}

/// Category ids that mark the two self-suppliable input classes.
#[derive(Clone, Copy, Debug)]
pub struct ClassRules {
    pub mineral_category: TypeId,
    pub planetary_category: TypeId,
}

impl Default for ClassRules {
    fn default() -> Self {
        Self {
            mineral_category: 18,
            planetary_category: 43,
        }
    }
}

/// Pure function of catalog contents; the same id always classifies the
/// same way within a run.
pub fn classify(catalog: &Catalog, rules: &ClassRules, id: TypeId) -> Classification {
    match catalog.category_of(id) {
        Some(category) if category == rules.mineral_category => Classification::Mineral,
        Some(category) if category == rules.planetary_category => Classification::Planetary,
        _ if catalog.blueprint_for(id).is_some() => Classification::Manufacturable,
        _ => Classification::MarketOnly,
    }
}
