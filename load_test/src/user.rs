//! Virtual user runtime.
//!
//! A virtual user owns its session and random source, repeatedly picks a
//! weighted task from its behavior profile, runs it, and pauses for a sampled
//! think time. Nothing is shared with other users except the recorder.

use std::sync::Arc;
use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use crate::config::profiles::BehaviorProfile;
use crate::config::PollSettings;
use crate::client::TargetClient;
use crate::error::HarnessError;
use crate::outcome::RequestRecorder;
use crate::tasks::{self, Task, TaskContext};

/// Longest pause a think time or poll delay may ask for
pub const MAX_PAUSE: Duration = Duration::from_secs(3600);

/// Uniform pause range between a user's successive actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThinkTime {
    min: Duration,
    max: Duration,
}

impl ThinkTime {
    /// Range in (fractional) seconds from user input; bounds are swapped if
    /// given out of order, anything outside `0..=MAX_PAUSE` is rejected
    pub fn try_between(min_secs: f64, max_secs: f64) -> Result<Self, HarnessError> {
        Ok(Self::ordered(pause(min_secs)?, pause(max_secs)?))
    }

    /// Range for built-in profiles; bounds are clamped into `0..=MAX_PAUSE`
    pub fn between(min_secs: f64, max_secs: f64) -> Self {
        Self::ordered(clamped_pause(min_secs), clamped_pause(max_secs))
    }

    fn ordered(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.min.as_micros() as u64;
        let max = self.max.as_micros() as u64;
        Duration::from_micros(rng.gen_range(min..=max))
    }
}

fn pause(secs: f64) -> Result<Duration, HarnessError> {
    match Duration::try_from_secs_f64(secs) {
        Ok(pause) if pause <= MAX_PAUSE => Ok(pause),
        _ => Err(HarnessError::InvalidConfig(format!(
            "pause of {}s is outside 0..={}s",
            secs,
            MAX_PAUSE.as_secs()
        ))),
    }
}

fn clamped_pause(secs: f64) -> Duration {
    if secs.is_nan() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(secs.clamp(0.0, MAX_PAUSE.as_secs_f64()))
}

/// Mutable per-user state carried across iterations
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: u64,
    pub think_time: ThinkTime,
    pub access_token: Option<String>,
    pub event_id: Option<String>,
}

impl Session {
    pub fn new(user_id: u64, profile: &BehaviorProfile) -> Self {
        Self {
            user_id,
            think_time: profile.think_time,
            access_token: None,
            event_id: profile.event_id.map(str::to_string),
        }
    }
}

pub struct VirtualUser {
    index: usize,
    profile: Arc<BehaviorProfile>,
    session: Session,
    rng: StdRng,
    task_weights: WeightedIndex<u32>,
    client: TargetClient,
    recorder: RequestRecorder,
    poll: PollSettings,
}

impl VirtualUser {
    /// Create user `index`; with a seed the user's whole random stream is reproducible
    pub fn new(
        index: usize,
        profile: Arc<BehaviorProfile>,
        client: TargetClient,
        recorder: RequestRecorder,
        poll: PollSettings,
        seed: Option<u64>,
    ) -> Result<Self, HarnessError> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let task_weights = WeightedIndex::new(profile.tasks.iter().map(|t| t.weight))
            .map_err(|e| {
                HarnessError::InvalidConfig(format!("profile '{}': {}", profile.name, e))
            })?;
        let user_id = rng.gen_range(profile.user_ids.clone());
        let session = Session::new(user_id, &profile);

        Ok(Self {
            index,
            profile,
            session,
            rng,
            task_weights,
            client,
            recorder,
            poll,
        })
    }

    pub fn profile(&self) -> &BehaviorProfile {
        &self.profile
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Weighted pick among the profile's tasks
    pub fn select_task(&mut self) -> Task {
        self.profile.tasks[self.task_weights.sample(&mut self.rng)].task
    }

    /// Run one task to completion; failures end up in the stats, never here
    pub async fn run_task(&mut self, task: Task, cancel: &CancellationToken) {
        let ctx = TaskContext::new(&self.client, &self.recorder, &self.poll, cancel);
        tasks::run(task, &ctx, &mut self.session, &mut self.rng).await;
    }

    pub fn next_think_time(&mut self) -> Duration {
        self.session.think_time.sample(&mut self.rng)
    }

    /// Loop task → think time until cancelled
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::debug!(
            "[{}-{}] user {} started",
            self.profile.name,
            self.index,
            self.session.user_id
        );

        while !cancel.is_cancelled() {
            let task = self.select_task();
            tracing::trace!("[{}-{}] {}", self.profile.name, self.index, task.name());
            self.run_task(task, &cancel).await;

            let pause = self.next_think_time();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        tracing::debug!(
            "[{}-{}] user {} stopped",
            self.profile.name,
            self.index,
            self.session.user_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::profiles::{self, WeightedTask};
    use crate::config::HttpSettings;
    use crate::metrics::collector::StatsCollector;

    fn user(profile: BehaviorProfile, seed: u64) -> VirtualUser {
        let client = TargetClient::new("http://localhost:8080", &HttpSettings::default()).unwrap();
        let recorder = RequestRecorder::new(StatsCollector::new(), Duration::from_secs(5));
        VirtualUser::new(
            0,
            Arc::new(profile),
            client,
            recorder,
            PollSettings::default(),
            Some(seed),
        )
        .unwrap()
    }

    #[test]
    fn test_think_time_sample_stays_in_range() {
        let think = ThinkTime::between(0.5, 2.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let pause = think.sample(&mut rng);
            assert!(pause >= Duration::from_millis(500));
            assert!(pause <= Duration::from_secs(2));
        }
    }

    #[test]
    fn test_think_time_swaps_reversed_bounds() {
        let think = ThinkTime::between(5.0, 2.0);
        assert_eq!(think.min(), Duration::from_secs(2));
        assert_eq!(think.max(), Duration::from_secs(5));
    }

    #[test]
    fn test_out_of_range_input_is_rejected() {
        for (min, max) in [
            (1.0, f64::INFINITY),
            (1.0, 1e20),
            (-1.0, 2.0),
            (f64::NAN, 2.0),
            (0.0, 3601.0),
        ] {
            assert!(
                matches!(
                    ThinkTime::try_between(min, max),
                    Err(HarnessError::InvalidConfig(_))
                ),
                "{} {}",
                min,
                max
            );
        }
        assert_eq!(
            ThinkTime::try_between(2.0, 0.5).unwrap(),
            ThinkTime::between(0.5, 2.0)
        );
    }

    #[test]
    fn test_between_clamps_instead_of_panicking() {
        let think = ThinkTime::between(f64::NAN, f64::INFINITY);
        assert_eq!(think.min(), Duration::ZERO);
        assert_eq!(think.max(), MAX_PAUSE);
        assert_eq!(ThinkTime::between(-3.0, 1e20).max(), MAX_PAUSE);
    }

    #[test]
    fn test_zero_think_time_samples_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(ThinkTime::between(0.0, 0.0).sample(&mut rng), Duration::ZERO);
    }

    #[test]
    fn test_user_id_drawn_from_profile_range() {
        let profile = profiles::fast_entry_profile();
        let range = profile.user_ids.clone();
        let user = user(profile, 3);
        assert!(range.contains(&user.session().user_id));
    }

    #[test]
    fn test_select_task_is_deterministic_with_seed() {
        let mut a = user(profiles::entry_only_profile(), 42);
        let mut b = user(profiles::entry_only_profile(), 42);

        let picks_a: Vec<Task> = (0..50).map(|_| a.select_task()).collect();
        let picks_b: Vec<Task> = (0..50).map(|_| b.select_task()).collect();
        assert_eq!(picks_a, picks_b);
        assert_eq!(a.session().user_id, b.session().user_id);
    }

    #[test]
    fn test_select_task_follows_weights() {
        let mut user = user(profiles::entry_only_profile(), 9);
        let joins = (0..1300)
            .filter(|_| user.select_task() == Task::EntryJoin)
            .count();
        // weights 10:3, expect ~1000 joins
        assert!((850..1150).contains(&joins), "joins = {}", joins);
    }

    #[test]
    fn test_zero_weight_task_is_never_selected() {
        let mut profile = profiles::entry_only_profile();
        profile.tasks = vec![
            WeightedTask::new(Task::EntryPage, 0),
            WeightedTask::new(Task::EntryJoin, 1),
        ];
        let mut user = user(profile, 11);
        assert!((0..200).all(|_| user.select_task() == Task::EntryJoin));
    }

    #[test]
    fn test_profile_without_tasks_is_rejected() {
        let mut profile = profiles::entry_only_profile();
        profile.tasks.clear();
        let client = TargetClient::new("http://localhost:8080", &HttpSettings::default()).unwrap();
        let recorder = RequestRecorder::new(StatsCollector::new(), Duration::from_secs(5));
        let result = VirtualUser::new(
            0,
            Arc::new(profile),
            client,
            recorder,
            PollSettings::default(),
            None,
        );
        assert!(matches!(result, Err(HarnessError::InvalidConfig(_))));
    }
}
