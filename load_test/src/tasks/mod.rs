// Tasks module
// HTTP interactions a virtual user can perform against the ticketing service

pub mod entry;
pub mod journey;
pub mod queue_enter;
pub mod seat;
pub mod waiting_room;

use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;

use crate::client::TargetClient;
use crate::config::PollSettings;
use crate::outcome::RequestRecorder;
use crate::user::{Session, ThinkTime};
use entry::JoinPolicy;

/// Think time installed by the slow-entry task after its first page load
pub const SLOW_ENTRY_FOLLOW_UP: (f64, f64) = (2.0, 5.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Join submission with strict redirect classification
    EntryJoin,
    /// Entry page load with content classification
    EntryPage,
    /// Join submission where any redirect is accepted
    RapidJoin,
    /// Page load followed by a join submission
    SlowEntry,
    QueueEnter,
    /// Queue enter that tolerates unparseable bodies
    QueueEnterRapid,
    /// Join, waiting room, seat and completion
    Journey,
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::EntryJoin => "entry-join",
            Task::EntryPage => "entry-page",
            Task::RapidJoin => "rapid-join",
            Task::SlowEntry => "slow-entry",
            Task::QueueEnter => "queue-enter",
            Task::QueueEnterRapid => "queue-enter-rapid",
            Task::Journey => "journey",
        }
    }
}

/// Borrowed handles a task needs to talk to the target and record outcomes
pub struct TaskContext<'a> {
    pub client: &'a TargetClient,
    pub recorder: &'a RequestRecorder,
    pub poll: &'a PollSettings,
    /// Run stop; multi-step tasks end early once it fires
    pub cancel: &'a CancellationToken,
}

impl<'a> TaskContext<'a> {
    pub fn new(
        client: &'a TargetClient,
        recorder: &'a RequestRecorder,
        poll: &'a PollSettings,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            client,
            recorder,
            poll,
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Execute one task; every request outcome is recorded, nothing is returned
pub async fn run(task: Task, ctx: &TaskContext<'_>, session: &mut Session, rng: &mut StdRng) {
    match task {
        Task::EntryJoin => {
            entry::submit_join(ctx, session.user_id, JoinPolicy::Strict).await;
        }
        Task::EntryPage => {
            entry::load_entry_page(ctx, session.user_id).await;
        }
        Task::RapidJoin => {
            entry::submit_join(ctx, session.user_id, JoinPolicy::AnyRedirect).await;
        }
        Task::SlowEntry => {
            if entry::load_entry_page(ctx, session.user_id).await.is_some() && !ctx.is_cancelled() {
                let (min, max) = SLOW_ENTRY_FOLLOW_UP;
                session.think_time = ThinkTime::between(min, max);
                entry::submit_join(ctx, session.user_id, JoinPolicy::AnyRedirect).await;
            }
        }
        Task::QueueEnter => {
            queue_enter::enter_queue(ctx, session, false).await;
        }
        Task::QueueEnterRapid => {
            queue_enter::enter_queue(ctx, session, true).await;
        }
        Task::Journey => {
            journey::run_journey(ctx, session, rng).await;
        }
    }
}
