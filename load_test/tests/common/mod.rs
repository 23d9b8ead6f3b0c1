//! Shared fixtures for the wiremock-backed tests.

#![allow(dead_code)]

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use ticket_load_test::client::TargetClient;
use ticket_load_test::config::{HttpSettings, PollSettings};
use ticket_load_test::metrics::collector::StatsCollector;
use ticket_load_test::metrics::types::StatsSnapshot;
use ticket_load_test::outcome::RequestRecorder;
use ticket_load_test::tasks::TaskContext;
use ticket_load_test::user::{Session, ThinkTime};
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

/// Client, recorder and poll settings pointed at a mock server
pub struct Fixture {
    pub server: MockServer,
    pub client: TargetClient,
    pub recorder: RequestRecorder,
    pub poll: PollSettings,
    pub cancel: CancellationToken,
}

impl Fixture {
    pub async fn start() -> Self {
        Self::with_poll_budget(3).await
    }

    /// Polls back to back, at most `max_attempts` times
    pub async fn with_poll_budget(max_attempts: u32) -> Self {
        let server = MockServer::start().await;
        let client = TargetClient::new(&server.uri(), &HttpSettings::default())
            .expect("mock server uri is a valid host");
        let stats = StatsCollector::new();
        stats.start();
        let recorder = RequestRecorder::new(stats, Duration::from_secs(5));
        let poll = PollSettings {
            max_attempts,
            delay: ThinkTime::between(0.0, 0.0),
        };

        Self {
            server,
            client,
            recorder,
            poll,
            cancel: CancellationToken::new(),
        }
    }

    pub fn ctx(&self) -> TaskContext<'_> {
        TaskContext::new(&self.client, &self.recorder, &self.poll, &self.cancel)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.recorder.stats().snapshot()
    }
}

pub fn session(user_id: u64) -> Session {
    Session {
        user_id,
        think_time: ThinkTime::between(0.0, 0.0),
        access_token: None,
        event_id: None,
    }
}

pub fn rng() -> StdRng {
    StdRng::seed_from_u64(7)
}

/// The single failure reason recorded so far
pub fn only_failure(snapshot: &StatsSnapshot) -> String {
    assert_eq!(
        snapshot.failure_reasons.len(),
        1,
        "failures: {:?}",
        snapshot.failure_reasons
    );
    snapshot
        .failure_reasons
        .keys()
        .next()
        .cloned()
        .unwrap_or_default()
}
