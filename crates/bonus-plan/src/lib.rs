//! bonus-plan: snapshot types and the deterministic spend planner.
//!
//! Shared by the execution runtime and by read-only display clients so both
//! derive the same plan from the same snapshot.

pub mod plan;
pub mod types;

pub use plan::{affordable_vip_tier, floor_to_unit, group_thousands, plan};
pub use types::*;
