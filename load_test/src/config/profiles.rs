use std::ops::RangeInclusive;

use clap::ValueEnum;

use crate::tasks::Task;
use crate::user::ThinkTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightedTask {
    pub task: Task,
    pub weight: u32,
}

impl WeightedTask {
    pub fn new(task: Task, weight: u32) -> Self {
        Self { task, weight }
    }
}

/// How one class of virtual user behaves
#[derive(Debug, Clone)]
pub struct BehaviorProfile {
    pub name: &'static str,
    /// Relative spawn frequency among the profiles of a mix
    pub weight: u32,
    pub think_time: ThinkTime,
    pub user_ids: RangeInclusive<u64>,
    /// Event the user queues for (queue-enter tasks only)
    pub event_id: Option<&'static str>,
    pub tasks: Vec<WeightedTask>,
}

/// Named set of profiles spawned together
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileMix {
    /// Entry page and join form only
    Entry,
    /// JSON queue-enter API
    Queue,
    /// Join, waiting room, seat and completion
    Journey,
}

impl ProfileMix {
    pub fn profiles(self) -> Vec<BehaviorProfile> {
        match self {
            ProfileMix::Entry => vec![
                entry_only_profile(),
                fast_entry_profile(),
                slow_entry_profile(),
            ],
            ProfileMix::Queue => vec![queue_enter_profile(), queue_stress_profile()],
            ProfileMix::Journey => vec![journey_profile()],
        }
    }

    pub fn targets(self) -> &'static str {
        match self {
            ProfileMix::Entry => "/entry, /entry/join",
            ProfileMix::Queue => "/api/queue/enter",
            ProfileMix::Journey => {
                "/entry/join, /entry/waiting, /entry/api/rank/{userId}, /seat, /seat/complete"
            }
        }
    }
}

/// Regular entry-path user
///
/// - weight 1, think time 0.5-2.0s
/// - join submission (strict redirect classification) 10 : entry page load 3
pub fn entry_only_profile() -> BehaviorProfile {
    BehaviorProfile {
        name: "entry-only",
        weight: 1,
        think_time: ThinkTime::between(0.5, 2.0),
        user_ids: 1000..=99999,
        event_id: None,
        tasks: vec![
            WeightedTask::new(Task::EntryJoin, 10),
            WeightedTask::new(Task::EntryPage, 3),
        ],
    }
}

/// Rapid join submitter
///
/// - weight 2, think time 0.1-0.5s
/// - any redirect counts as success
pub fn fast_entry_profile() -> BehaviorProfile {
    BehaviorProfile {
        name: "fast-entry",
        weight: 2,
        think_time: ThinkTime::between(0.1, 0.5),
        user_ids: 100000..=999999,
        event_id: None,
        tasks: vec![WeightedTask::new(Task::RapidJoin, 1)],
    }
}

/// Slow, human-paced user: page load, then join
///
/// - weight 1, think time 3-10s, narrowed to 2-5s after the first page load
pub fn slow_entry_profile() -> BehaviorProfile {
    BehaviorProfile {
        name: "slow-entry",
        weight: 1,
        think_time: ThinkTime::between(3.0, 10.0),
        user_ids: 10000..=99999,
        event_id: None,
        tasks: vec![WeightedTask::new(Task::SlowEntry, 1)],
    }
}

pub fn queue_enter_profile() -> BehaviorProfile {
    BehaviorProfile {
        name: "queue-enter",
        weight: 1,
        think_time: ThinkTime::between(0.1, 0.5),
        user_ids: 1000..=9999,
        event_id: Some("EVENT_001"),
        tasks: vec![WeightedTask::new(Task::QueueEnter, 1)],
    }
}

/// Queue-enter stress user; tolerates unparseable bodies
pub fn queue_stress_profile() -> BehaviorProfile {
    BehaviorProfile {
        name: "queue-stress",
        weight: 5,
        think_time: ThinkTime::between(0.0, 0.2),
        user_ids: 10000..=99999,
        event_id: Some("EVENT_STRESS"),
        tasks: vec![WeightedTask::new(Task::QueueEnterRapid, 1)],
    }
}

pub fn journey_profile() -> BehaviorProfile {
    BehaviorProfile {
        name: "journey",
        weight: 1,
        think_time: ThinkTime::between(1.0, 3.0),
        user_ids: 1000..=99999,
        event_id: None,
        tasks: vec![
            WeightedTask::new(Task::Journey, 5),
            WeightedTask::new(Task::EntryPage, 1),
        ],
    }
}
