pub mod health;
pub mod metrics;
pub mod narrative;
pub mod predict;
pub mod report;
