//! Domain logic for the industry scan lives here.

pub mod classify;
pub mod cost;
pub mod entities;
pub mod ranking;

pub use classify::{classify, ClassRules, Classification};
pub use cost::{CostResolver, CostVector, IntegrityError};
pub use entities::{Catalog, ItemInfo, MarketSnapshot, ScanConfig, TypeId, UNKNOWN_VOLUME};
pub use ranking::{rank_candidates, RankingOutcome, ReportRow};
