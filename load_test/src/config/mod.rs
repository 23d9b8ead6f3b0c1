//! Run configuration, assembled from command line arguments.

pub mod profiles;

use std::time::Duration;

use crate::cli::{Cli, JourneyArgs, Scenario};
use crate::client::parse_host;
use crate::error::HarnessError;
use crate::user::ThinkTime;
use profiles::ProfileMix;

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("ticket-load-test/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Waiting-room rank polling budget
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub delay: ThinkTime,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: ThinkTime::between(1.0, 2.0),
        }
    }
}

impl TryFrom<&JourneyArgs> for PollSettings {
    type Error = HarnessError;

    fn try_from(args: &JourneyArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            max_attempts: args.max_polls,
            delay: ThinkTime::try_between(args.poll_delay_min, args.poll_delay_max)?,
        })
    }
}

/// Upper bound for every run-level duration (run length, grace, report interval, timeout)
pub const MAX_RUN_DURATION: Duration = Duration::from_secs(30 * 24 * 3600);

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub host: String,
    pub users: usize,
    /// Users spawned per second
    pub spawn_rate: f64,
    pub duration: Duration,
    /// `None` disables the live view
    pub report_interval: Option<Duration>,
    pub stop_grace: Duration,
    pub seed: Option<u64>,
    pub http: HttpSettings,
    pub poll: PollSettings,
    pub slow_threshold: Duration,
    pub mix: ProfileMix,
}

impl RunConfig {
    /// Defaults for `mix` against `host`
    pub fn new(host: impl Into<String>, mix: ProfileMix) -> Self {
        Self {
            host: host.into(),
            users: 20,
            spawn_rate: 2.0,
            duration: Duration::from_secs(180),
            report_interval: Some(Duration::from_secs(5)),
            stop_grace: Duration::from_secs(10),
            seed: None,
            http: HttpSettings::default(),
            poll: PollSettings::default(),
            slow_threshold: Duration::from_millis(5000),
            mix,
        }
    }

    pub fn validate(&self) -> Result<(), HarnessError> {
        parse_host(&self.host)?;

        if self.users == 0 {
            return Err(HarnessError::InvalidConfig(
                "at least one user is required".to_string(),
            ));
        }
        if !self.spawn_rate.is_finite() || self.spawn_rate <= 0.0 {
            return Err(HarnessError::InvalidConfig(format!(
                "spawn rate must be positive, got {}",
                self.spawn_rate
            )));
        }
        if Duration::try_from_secs_f64(1.0 / self.spawn_rate).is_err() {
            return Err(HarnessError::InvalidConfig(format!(
                "spawn rate {} is too small",
                self.spawn_rate
            )));
        }
        if self.duration.is_zero() {
            return Err(HarnessError::InvalidConfig(
                "duration must be positive".to_string(),
            ));
        }
        let bounded = [
            ("duration", Some(self.duration)),
            ("stop grace", Some(self.stop_grace)),
            ("report interval", self.report_interval),
            ("request timeout", Some(self.http.timeout)),
        ];
        for (name, value) in bounded {
            if value.is_some_and(|value| value > MAX_RUN_DURATION) {
                return Err(HarnessError::InvalidConfig(format!(
                    "{} exceeds {}s",
                    name,
                    MAX_RUN_DURATION.as_secs()
                )));
            }
        }
        if self.poll.max_attempts == 0 {
            return Err(HarnessError::InvalidConfig(
                "poll budget must allow at least one attempt".to_string(),
            ));
        }
        Ok(())
    }

    /// Pause between user spawns, never longer than the run itself
    pub fn spawn_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.spawn_rate)
            .unwrap_or(self.duration)
            .min(self.duration)
            .max(Duration::from_millis(1))
    }
}

impl TryFrom<&Cli> for RunConfig {
    type Error = HarnessError;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        let (mix, poll) = match &cli.scenario {
            Scenario::Entry => (ProfileMix::Entry, PollSettings::default()),
            Scenario::Queue => (ProfileMix::Queue, PollSettings::default()),
            Scenario::Journey(args) => (ProfileMix::Journey, PollSettings::try_from(args)?),
        };

        Ok(Self {
            host: cli.host.clone(),
            users: cli.users,
            spawn_rate: cli.spawn_rate,
            duration: Duration::from_secs(cli.duration),
            report_interval: (cli.report_interval > 0)
                .then(|| Duration::from_secs(cli.report_interval)),
            stop_grace: Duration::from_secs(cli.stop_grace),
            seed: cli.seed,
            http: HttpSettings {
                timeout: Duration::from_secs(cli.request_timeout),
                ..HttpSettings::default()
            },
            poll,
            slow_threshold: Duration::from_millis(cli.slow_threshold_ms),
            mix,
        })
    }
}
