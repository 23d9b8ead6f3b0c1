//! Full user journey: join, waiting room, seat, completion.
//!
//! Steps run strictly in order for one user. A failed step ends the journey
//! for this iteration; the user simply starts over after its think time.
//! A journey cut short by the run stopping counts as unresolved.

use rand::rngs::StdRng;

use crate::metrics::collector::StatsCollector;
use crate::metrics::types::JourneyOutcome;
use crate::tasks::entry::{self, JoinDisposition, JoinPolicy};
use crate::tasks::seat::{self, SeatOutcome};
use crate::tasks::waiting_room::{self, PollOutcome};
use crate::tasks::TaskContext;
use crate::user::Session;

pub async fn run_journey(
    ctx: &TaskContext<'_>,
    session: &mut Session,
    rng: &mut StdRng,
) -> JourneyOutcome {
    let record = JourneyRecord::start(ctx.recorder.stats());

    let outcome = journey_steps(ctx, session, rng).await;

    tracing::debug!("[{}] journey ended: {:?}", session.user_id, outcome);
    record.finish(outcome);
    outcome
}

/// Pairs `journey_started` with exactly one `journey_finished`, also when
/// the journey's task is aborted mid-step
struct JourneyRecord<'a> {
    stats: &'a StatsCollector,
    finished: bool,
}

impl<'a> JourneyRecord<'a> {
    fn start(stats: &'a StatsCollector) -> Self {
        stats.journey_started();
        Self {
            stats,
            finished: false,
        }
    }

    fn finish(mut self, outcome: JourneyOutcome) {
        self.finished = true;
        self.stats.journey_finished(outcome);
    }
}

impl Drop for JourneyRecord<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.stats.journey_finished(JourneyOutcome::Unresolved);
        }
    }
}

async fn journey_steps(
    ctx: &TaskContext<'_>,
    session: &mut Session,
    rng: &mut StdRng,
) -> JourneyOutcome {
    let user_id = session.user_id;

    let seat = match entry::submit_join(ctx, user_id, JoinPolicy::Strict).await {
        None => return JourneyOutcome::Failed,
        Some(JoinDisposition::Bounced(_)) => return JourneyOutcome::Bounced,
        Some(JoinDisposition::Admitted(location)) => {
            match seat::seat_location(ctx, &location, session.access_token.as_deref()) {
                Ok(url) => url,
                Err(e) => {
                    tracing::error!("[{}] {}", user_id, e);
                    return JourneyOutcome::Failed;
                }
            }
        }
        Some(JoinDisposition::Queued(location)) => {
            if ctx.is_cancelled() {
                return JourneyOutcome::Unresolved;
            }
            match waiting_room::wait_for_admission(ctx, user_id, &location, rng).await {
                PollOutcome::Admitted(token) => {
                    let url = match seat::seat_url(ctx, user_id, &token) {
                        Ok(url) => url,
                        Err(e) => {
                            tracing::error!("[{}] {}", user_id, e);
                            return JourneyOutcome::Failed;
                        }
                    };
                    session.access_token = Some(token);
                    url
                }
                PollOutcome::Exhausted | PollOutcome::Cancelled => {
                    return JourneyOutcome::Unresolved
                }
                PollOutcome::Failed => return JourneyOutcome::Failed,
            }
        }
    };

    if ctx.is_cancelled() {
        return JourneyOutcome::Unresolved;
    }
    match seat::complete_seat(ctx, user_id, &seat).await {
        SeatOutcome::Completed => JourneyOutcome::Completed,
        SeatOutcome::Cancelled => JourneyOutcome::Unresolved,
        SeatOutcome::Denied | SeatOutcome::Failed => JourneyOutcome::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_journey_counts_as_unresolved() {
        let stats = StatsCollector::new();
        stats.start();

        JourneyRecord::start(&stats).finish(JourneyOutcome::Completed);
        drop(JourneyRecord::start(&stats));

        let journeys = stats.snapshot().journeys;
        assert_eq!(journeys.started, 2);
        assert_eq!(journeys.finished(), 2);
        assert_eq!(journeys.completed, 1);
        assert_eq!(journeys.unresolved, 1);
    }
}
