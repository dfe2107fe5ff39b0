pub mod models;
pub mod planner;

pub use models::*;
pub use planner::{build_plan, format_plan, position_size};
