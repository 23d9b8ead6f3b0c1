mod args;

pub use args::{Cli, JourneyArgs, Scenario};
