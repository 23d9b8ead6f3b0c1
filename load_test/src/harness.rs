//! Run lifecycle: reachability check, user spawning, shutdown and reporting.

use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::JoinSet;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::client::TargetClient;
use crate::config::profiles::BehaviorProfile;
use crate::config::RunConfig;
use crate::error::HarnessError;
use crate::metrics::collector::StatsCollector;
use crate::metrics::reporter;
use crate::metrics::types::StatsSnapshot;
use crate::outcome::RequestRecorder;
use crate::tasks::entry::ENTRY_PATH;
use crate::user::VirtualUser;

/// Drives one load test run. A harness is single-use: once stopped, its
/// cancellation token stays cancelled.
pub struct Harness {
    config: RunConfig,
    client: TargetClient,
    stats: StatsCollector,
    recorder: RequestRecorder,
    profiles: Vec<Arc<BehaviorProfile>>,
    profile_weights: WeightedIndex<u32>,
    cancel: CancellationToken,
}

impl Harness {
    pub fn new(config: RunConfig) -> Result<Self, HarnessError> {
        config.validate()?;

        let client = TargetClient::new(&config.host, &config.http)?;
        let stats = StatsCollector::new();
        let recorder = RequestRecorder::new(stats.clone(), config.slow_threshold);

        let profiles: Vec<Arc<BehaviorProfile>> =
            config.mix.profiles().into_iter().map(Arc::new).collect();
        for profile in &profiles {
            WeightedIndex::new(profile.tasks.iter().map(|t| t.weight)).map_err(|e| {
                HarnessError::InvalidConfig(format!("profile '{}' tasks: {}", profile.name, e))
            })?;
        }
        let profile_weights = WeightedIndex::new(profiles.iter().map(|p| p.weight))
            .map_err(|e| HarnessError::InvalidConfig(format!("profile weights: {}", e)))?;

        Ok(Self {
            config,
            client,
            stats,
            recorder,
            profiles,
            profile_weights,
            cancel: CancellationToken::new(),
        })
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }

    /// Cancelling this token stops the run early (Ctrl+C)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Any HTTP response counts as reachable; only transport failures stop the run
    pub async fn check_target(&self) -> Result<(), HarnessError> {
        match self.client.get(ENTRY_PATH).await {
            Ok(response) => {
                tracing::info!(
                    "Target {} reachable (GET {} -> {})",
                    self.config.host,
                    ENTRY_PATH,
                    response.status().as_u16()
                );
                Ok(())
            }
            Err(HarnessError::Network(source)) => Err(HarnessError::Unreachable {
                host: self.config.host.clone(),
                source,
            }),
            Err(e) => Err(e),
        }
    }

    pub fn on_start(&self) {
        self.stats.start();

        tracing::info!("{}", "=".repeat(60));
        tracing::info!("Load test started against {}", self.config.host);
        tracing::info!("Targets: {}", self.config.mix.targets());
        for profile in &self.profiles {
            tracing::info!(
                "  {} (weight={}) think {:.1}-{:.1}s",
                profile.name,
                profile.weight,
                profile.think_time.min().as_secs_f64(),
                profile.think_time.max().as_secs_f64()
            );
        }
        tracing::info!(
            "Users: {}  Spawn rate: {}/s  Duration: {}s",
            self.config.users,
            self.config.spawn_rate,
            self.config.duration.as_secs()
        );
        tracing::info!("{}", "=".repeat(60));
    }

    /// Finalize the stats and print the final report
    pub fn on_stop(&self) -> StatsSnapshot {
        let snapshot = self.stats.finalize();

        tracing::info!("{}", "=".repeat(60));
        tracing::info!("Load test finished");
        tracing::info!("Total requests: {}", snapshot.total.requests);
        tracing::info!("Failures: {}", snapshot.total.failures);
        tracing::info!(
            "Average response time: {:.2}ms",
            snapshot.total.avg_response_ms()
        );

        reporter::print_final_report(&self.stats, &snapshot);
        snapshot
    }

    /// Pick a profile and build user `index`
    pub fn spawn_user(&self, index: usize, rng: &mut StdRng) -> Result<VirtualUser, HarnessError> {
        let profile = self.profiles[self.profile_weights.sample(rng)].clone();
        let seed = self
            .config
            .seed
            .map(|seed| seed.wrapping_add(index as u64 + 1));

        VirtualUser::new(
            index,
            profile,
            self.client.clone(),
            self.recorder.clone(),
            self.config.poll,
            seed,
        )
    }

    pub async fn run(&self) -> Result<StatsSnapshot, HarnessError> {
        self.check_target().await?;
        self.on_start();

        let live_reporter = self.config.report_interval.map(|every| {
            tokio::spawn(reporter::start_periodic_reporter(
                self.stats.clone(),
                every.as_secs(),
                self.cancel.child_token(),
            ))
        });

        let deadline = Instant::now() + self.config.duration;
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut users = JoinSet::new();
        let mut ticker = interval(self.config.spawn_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut spawned = 0;
        while spawned < self.config.users {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep_until(deadline) => break,
                _ = ticker.tick() => {
                    let user = self.spawn_user(spawned, &mut rng)?;
                    users.spawn(user.run(self.cancel.child_token()));
                    spawned += 1;
                }
            }
        }
        tracing::info!("Spawned {} users", spawned);

        tokio::select! {
            _ = self.cancel.cancelled() => tracing::info!("Run cancelled"),
            _ = sleep_until(deadline) => tracing::info!("Run duration elapsed"),
        }
        self.cancel.cancel();

        self.drain(users).await;
        if let Some(handle) = live_reporter {
            let _ = handle.await;
        }

        Ok(self.on_stop())
    }

    /// Let in-flight users finish within the grace period, then abandon the rest
    async fn drain(&self, mut users: JoinSet<()>) {
        tracing::info!(
            "Stopping {} users (grace period {}s)",
            users.len(),
            self.config.stop_grace.as_secs()
        );

        let finished = tokio::time::timeout(self.config.stop_grace, async {
            while let Some(result) = users.join_next().await {
                if let Err(e) = result {
                    if e.is_panic() {
                        tracing::error!("User task panicked: {}", e);
                    }
                }
            }
        })
        .await;

        if finished.is_err() {
            tracing::warn!(
                "{} users still busy after grace period, abandoning",
                users.len()
            );
            users.abort_all();
            while users.join_next().await.is_some() {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::profiles::ProfileMix;

    fn config(mix: ProfileMix) -> RunConfig {
        let mut config = RunConfig::new("http://127.0.0.1:9", mix);
        config.seed = Some(1234);
        config
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut bad = config(ProfileMix::Entry);
        bad.users = 0;
        assert!(matches!(
            Harness::new(bad),
            Err(HarnessError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_profile_assignment_follows_weights() {
        let harness = Harness::new(config(ProfileMix::Queue)).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        let stress = (0..600)
            .map(|i| harness.spawn_user(i, &mut rng).unwrap())
            .filter(|user| user.profile().name == "queue-stress")
            .count();
        // weights 1:5, expect ~500
        assert!((440..560).contains(&stress), "stress users = {}", stress);
    }

    #[test]
    fn test_seeded_spawns_are_reproducible() {
        let harness = Harness::new(config(ProfileMix::Entry)).unwrap();

        let ids = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|i| {
                    let user = harness.spawn_user(i, &mut rng).unwrap();
                    (user.profile().name, user.session().user_id)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(77), ids(77));
    }
}
