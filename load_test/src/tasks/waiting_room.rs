//! Waiting room page and rank polling.

use rand::rngs::StdRng;
use serde::Deserialize;

use crate::error::HarnessError;
use crate::tasks::TaskContext;

/// Stats name shared by every rank poll regardless of user id
pub const RANK_STATS_NAME: &str = "/entry/api/rank/[userId]";

pub fn rank_path(user_id: u64) -> String {
    format!("/entry/api/rank/{}", user_id)
}

/// Body of the rank endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankStatus {
    /// Absent or null once the user has left the queue
    #[serde(default)]
    pub rank: Option<i64>,
    pub is_admitted: bool,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub queue_size: Option<i64>,
}

impl RankStatus {
    /// Token to carry into the seat flow, if the user is admitted with one
    pub fn admission_token(&self) -> Option<&str> {
        match self.access_token.as_deref() {
            Some(token) if self.is_admitted && !token.is_empty() => Some(token),
            _ => None,
        }
    }
}

pub fn parse_rank(body: &str) -> Result<RankStatus, HarnessError> {
    Ok(serde_json::from_str(body)?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Admitted with the token to carry into the seat flow
    Admitted(String),
    /// Budget used up while still waiting
    Exhausted,
    /// Run stopped while waiting
    Cancelled,
    Failed,
}

/// Load the waiting room page once, then poll the rank endpoint until
/// admitted with a token, a request fails, the run stops, or the poll budget
/// runs out.
pub async fn wait_for_admission(
    ctx: &TaskContext<'_>,
    user_id: u64,
    waiting_room: &str,
    rng: &mut StdRng,
) -> PollOutcome {
    if !load_waiting_room(ctx, user_id, waiting_room).await {
        return PollOutcome::Failed;
    }

    let max_attempts = ctx.poll.max_attempts;
    for attempt in 1..=max_attempts {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                tracing::debug!("[{}] stopped waiting after {} polls", user_id, attempt - 1);
                return PollOutcome::Cancelled;
            }
            _ = tokio::time::sleep(ctx.poll.delay.sample(rng)) => {}
        }

        match poll_rank(ctx, user_id).await {
            Some(status) => {
                if let Some(token) = status.admission_token() {
                    tracing::debug!("[{}] admitted after {} polls", user_id, attempt);
                    return PollOutcome::Admitted(token.to_string());
                }
                tracing::debug!(
                    "[{}] poll {}/{}: rank {:?}",
                    user_id,
                    attempt,
                    max_attempts,
                    status.rank
                );
            }
            None => return PollOutcome::Failed,
        }
    }

    tracing::debug!(
        "[{}] not admitted after {} polls",
        user_id,
        max_attempts
    );
    PollOutcome::Exhausted
}

async fn load_waiting_room(ctx: &TaskContext<'_>, user_id: u64, waiting_room: &str) -> bool {
    let name = ctx
        .client
        .url(waiting_room)
        .map(|url| url.path().to_string())
        .unwrap_or_else(|_| waiting_room.to_string());
    let mut check = ctx.recorder.begin("GET", name);

    match ctx.client.get(waiting_room).await {
        Ok(response) => {
            let status = response.status().as_u16();
            check.respond(status);
            if status == 200 {
                check.success();
                true
            } else {
                tracing::debug!("[{}] waiting room failed: {}", user_id, status);
                check.failure(&HarnessError::unexpected_status("waiting room status", status));
                false
            }
        }
        Err(e) => {
            check.failure(&e);
            false
        }
    }
}

/// One rank poll; `None` when the request or its payload failed
async fn poll_rank(ctx: &TaskContext<'_>, user_id: u64) -> Option<RankStatus> {
    let mut check = ctx.recorder.begin("GET", RANK_STATS_NAME);

    let response = match ctx.client.get(&rank_path(user_id)).await {
        Ok(response) => response,
        Err(e) => {
            check.failure(&e);
            return None;
        }
    };

    let status = response.status().as_u16();
    check.respond(status);
    if status != 200 {
        check.failure(&HarnessError::unexpected_status("rank check status", status));
        return None;
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            check.failure(&HarnessError::from(e));
            return None;
        }
    };

    match parse_rank(&body) {
        Ok(rank) => {
            if rank.admission_token().is_some() {
                check.success_as("rank-admitted");
            } else {
                check.success_as("rank-waiting");
            }
            Some(rank)
        }
        Err(e) => {
            tracing::warn!("[{}] {}", user_id, e);
            check.failure(&e);
            None
        }
    }
}
