//! Scenario-driven load generator for the ticketing service.
//!
//! Virtual users hit the entry page, join form, waiting room, seat page and
//! queue-enter API with weighted behavior profiles and randomized think
//! times. Each request is judged exactly once and folded into a shared
//! [`metrics::collector::StatsCollector`]; the [`harness::Harness`] reports
//! the totals when the run stops.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod harness;
pub mod metrics;
pub mod outcome;
pub mod tasks;
pub mod user;

pub use error::HarnessError;
pub use harness::Harness;
