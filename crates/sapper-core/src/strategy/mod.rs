//! Strategy - candidate generation, scoring, arbitration, and boosters.

mod boosters;
mod coordinator;
mod planner;

pub use boosters::{BoosterKind, BoosterPlanner};
pub use coordinator::{Coordinator, TickReport};
pub use planner::{ActionKind, Candidate, PlanContext, Planner, Pressure, RoleBook};
