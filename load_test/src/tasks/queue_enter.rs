//! JSON queue-enter API.

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::tasks::TaskContext;
use crate::user::Session;

pub const QUEUE_ENTER_PATH: &str = "/api/queue/enter";
pub const DEFAULT_EVENT_ID: &str = "EVENT_001";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEnterRequest<'a> {
    pub event_id: &'a str,
    pub user_id: u64,
}

/// Body of an accepted queue-enter call. A queued (202) response carries a
/// token; a processed (200) one reports `position` and `estimatedWaitTime`
/// instead. Every field is optional, only non-JSON bodies are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueTicket {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, alias = "position")]
    pub queue_position: Option<i64>,
    #[serde(default, alias = "estimatedWaitTime")]
    pub estimated_wait_time_seconds: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// 200: handled immediately
    Processed,
    /// 202: placed in the queue
    Queued,
}

impl Admission {
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200 => Some(Admission::Processed),
            202 => Some(Admission::Queued),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Admission::Processed => "processed",
            Admission::Queued => "queued",
        }
    }
}

pub fn parse_ticket(body: &str) -> Result<QueueTicket, HarnessError> {
    Ok(serde_json::from_str(body)?)
}

/// POST the queue-enter request. With `lenient`, an accepted status with an
/// unreadable body still counts as success.
pub async fn enter_queue(
    ctx: &TaskContext<'_>,
    session: &Session,
    lenient: bool,
) -> Option<(Admission, Option<QueueTicket>)> {
    let event_id = session.event_id.as_deref().unwrap_or(DEFAULT_EVENT_ID);
    let request = QueueEnterRequest {
        event_id,
        user_id: session.user_id,
    };
    let headers = [("X-User-ID", session.user_id.to_string())];

    let mut check = ctx.recorder.begin("POST", QUEUE_ENTER_PATH);
    let response = match ctx
        .client
        .post_json(QUEUE_ENTER_PATH, &request, &headers)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            check.failure(&e);
            return None;
        }
    };

    let status = response.status().as_u16();
    check.respond(status);
    let Some(admission) = Admission::from_status(status) else {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!("[{}] queue enter failed: {} - {}", session.user_id, status, body);
        check.failure(&HarnessError::unexpected_status("queue enter status", status));
        return None;
    };

    let parsed = match response.text().await {
        Ok(body) => parse_ticket(&body),
        Err(e) => Err(HarnessError::from(e)),
    };

    match parsed {
        Ok(ticket) => {
            tracing::debug!(
                "[{}] {} - token: {}, position: {}, wait: {}s",
                session.user_id,
                admission.label(),
                ticket.token.as_deref().unwrap_or("N/A"),
                ticket
                    .queue_position
                    .map_or_else(|| "N/A".to_string(), |p| p.to_string()),
                ticket
                    .estimated_wait_time_seconds
                    .map_or_else(|| "N/A".to_string(), |w| w.to_string())
            );
            check.success_as(admission.label());
            Some((admission, Some(ticket)))
        }
        Err(e) if lenient => {
            tracing::debug!("[{}] {} with unreadable body: {}", session.user_id, admission.label(), e);
            check.success_as(admission.label());
            Some((admission, None))
        }
        Err(e) => {
            tracing::warn!("[{}] queue enter response parsing failed: {}", session.user_id, e);
            check.failure(&e);
            None
        }
    }
}
