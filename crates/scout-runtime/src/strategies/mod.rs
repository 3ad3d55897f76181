//! Built-in strategies, highest priority first.
//!
//! | strategy                   | score | when                                           |
//! |----------------------------|-------|------------------------------------------------|
//! | [`SurvivalStrategy`]       | 100   | threat level above 50                          |
//! | [`LootStrategy`]           | 50    | a valued item is remembered and not abandoned  |
//! | [`SearchBuildingStrategy`] | 30    | inside an unsearched room, planner free        |
//! | [`IdleStrategy`]           | 1     | always                                         |

pub mod idle;
pub mod loot;
pub mod search_building;
pub mod survival;

pub use idle::IdleStrategy;
pub use loot::LootStrategy;
pub use search_building::SearchBuildingStrategy;
pub use survival::SurvivalStrategy;

use crate::strategy::Strategy;

/// The standard set, in tie-breaking order.
pub fn default_strategies() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(SurvivalStrategy::new()),
        Box::new(LootStrategy::new()),
        Box::new(SearchBuildingStrategy::new()),
        Box::new(IdleStrategy),
    ]
}
