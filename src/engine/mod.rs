pub mod aggregation;
pub mod evaluation;
pub mod planner;
