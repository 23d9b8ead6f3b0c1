// Metrics module
// Run statistics collection and console reporting

pub mod collector;
pub mod reporter;
pub mod types;
