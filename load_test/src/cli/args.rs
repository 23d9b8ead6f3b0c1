use clap::{Args, Parser, Subcommand};

/// Ticketing Load Testing Tool
#[derive(Parser, Debug)]
#[command(name = "ticket-load-test")]
#[command(about = "Load generator for the ticketing entry, queue and seat endpoints")]
#[command(version)]
pub struct Cli {
    /// Base URL of the ticketing service
    #[arg(long, default_value = "http://localhost:8080", env = "TICKET_HOST")]
    pub host: String,

    /// Number of virtual users to spawn
    #[arg(short, long, default_value = "20")]
    pub users: usize,

    /// Users spawned per second
    #[arg(short = 'r', long, default_value = "2.0")]
    pub spawn_rate: f64,

    /// Test duration in seconds
    #[arg(short = 't', long, default_value = "180")]
    pub duration: u64,

    /// Live stats interval in seconds (0 disables the live view)
    #[arg(long, default_value = "5")]
    pub report_interval: u64,

    /// Seconds in-flight users may keep running after the duration elapses
    #[arg(long, default_value = "10")]
    pub stop_grace: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    pub request_timeout: u64,

    /// Responses slower than this many milliseconds are logged
    #[arg(long, default_value = "5000")]
    pub slow_threshold_ms: u64,

    /// Seed for reproducible profile assignment, user ids and task selection
    #[arg(long)]
    pub seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub scenario: Scenario,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Scenario {
    /// Entry page and join form only (regular, fast and slow users)
    Entry,

    /// JSON queue-enter API (regular and stress users)
    Queue,

    /// Full journey: join, waiting room polling, seat and completion
    Journey(JourneyArgs),
}

#[derive(Args, Debug, Clone)]
pub struct JourneyArgs {
    /// Maximum rank polls per waiting-room visit
    #[arg(long, default_value = "10")]
    pub max_polls: u32,

    /// Minimum delay between rank polls in seconds
    #[arg(long, default_value = "1.0")]
    pub poll_delay_min: f64,

    /// Maximum delay between rank polls in seconds
    #[arg(long, default_value = "2.0")]
    pub poll_delay_max: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_entry_scenario_with_load_shape() {
        let cli = Cli::try_parse_from([
            "ticket-load-test",
            "--host",
            "http://tickets.local:8080",
            "-u",
            "100",
            "-r",
            "5",
            "-t",
            "600",
            "entry",
        ])
        .unwrap();

        assert_eq!(cli.host, "http://tickets.local:8080");
        assert_eq!(cli.users, 100);
        assert_eq!(cli.spawn_rate, 5.0);
        assert_eq!(cli.duration, 600);
        assert!(matches!(cli.scenario, Scenario::Entry));
    }

    #[test]
    fn test_parse_journey_poll_settings() {
        let cli = Cli::try_parse_from([
            "ticket-load-test",
            "--seed",
            "7",
            "journey",
            "--max-polls",
            "3",
            "--poll-delay-min",
            "0.1",
            "--poll-delay-max",
            "0.2",
        ])
        .unwrap();

        assert_eq!(cli.seed, Some(7));
        match cli.scenario {
            Scenario::Journey(args) => {
                assert_eq!(args.max_polls, 3);
                assert_eq!(args.poll_delay_min, 0.1);
                assert_eq!(args.poll_delay_max, 0.2);
            }
            other => panic!("unexpected scenario {:?}", other),
        }
    }

    #[test]
    fn test_scenario_is_required() {
        assert!(Cli::try_parse_from(["ticket-load-test"]).is_err());
    }
}
