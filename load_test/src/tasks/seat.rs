//! Seat page and completion.

use crate::client::location;
use crate::error::HarnessError;
use crate::tasks::entry::{is_redirect, SEAT_PATH};
use crate::tasks::TaskContext;

pub const COMPLETE_PATH: &str = "/seat/complete";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatOutcome {
    Completed,
    /// Seat page redirected the user away
    Denied,
    /// Run stopped between the seat page and completion
    Cancelled,
    Failed,
}

/// Seat page URL carrying the user id and access token
pub fn seat_url(ctx: &TaskContext<'_>, user_id: u64, token: &str) -> Result<String, HarnessError> {
    let mut url = ctx.client.url(SEAT_PATH)?;
    url.query_pairs_mut()
        .append_pair("userId", &user_id.to_string())
        .append_pair("token", token);
    Ok(url.to_string())
}

/// Seat URL from a direct-admission redirect; the session's last token is
/// added when the redirect carries none
pub fn seat_location(
    ctx: &TaskContext<'_>,
    location: &str,
    token: Option<&str>,
) -> Result<String, HarnessError> {
    let mut url = ctx.client.url(location)?;
    if let Some(token) = token {
        if !url.query_pairs().any(|(key, _)| key == "token") {
            url.query_pairs_mut().append_pair("token", token);
        }
    }
    Ok(url.to_string())
}

/// Load the seat page and, once it renders, submit completion
pub async fn complete_seat(ctx: &TaskContext<'_>, user_id: u64, seat: &str) -> SeatOutcome {
    let outcome = load_seat_page(ctx, user_id, seat).await;
    if outcome != SeatOutcome::Completed {
        return outcome;
    }
    if ctx.is_cancelled() {
        return SeatOutcome::Cancelled;
    }

    if submit_completion(ctx, user_id).await {
        SeatOutcome::Completed
    } else {
        SeatOutcome::Failed
    }
}

/// `Completed` here means the page rendered and completion may follow
async fn load_seat_page(ctx: &TaskContext<'_>, user_id: u64, seat: &str) -> SeatOutcome {
    let mut check = ctx.recorder.begin("GET", SEAT_PATH);

    let response = match ctx.client.get(seat).await {
        Ok(response) => response,
        Err(e) => {
            check.failure(&e);
            return SeatOutcome::Failed;
        }
    };

    let status = response.status().as_u16();
    check.respond(status);
    match status {
        200 => {
            check.success();
            SeatOutcome::Completed
        }
        302 => {
            let target = location(&response);
            tracing::debug!("[{}] seat access denied, sent to {}", user_id, target);
            check.failure(&HarnessError::AccessDenied(target));
            SeatOutcome::Denied
        }
        other => {
            check.failure(&HarnessError::unexpected_status("seat page status", other));
            SeatOutcome::Failed
        }
    }
}

async fn submit_completion(ctx: &TaskContext<'_>, user_id: u64) -> bool {
    let mut check = ctx.recorder.begin("POST", COMPLETE_PATH);
    let form = [("userId", user_id.to_string())];

    match ctx.client.post_form(COMPLETE_PATH, &form).await {
        Ok(response) => {
            let status = response.status().as_u16();
            check.respond(status);
            if is_redirect(status) {
                tracing::debug!("[{}] seat completed", user_id);
                check.success();
                true
            } else {
                check.failure(&HarnessError::unexpected_status(
                    "completion status",
                    status,
                ));
                false
            }
        }
        Err(e) => {
            check.failure(&e);
            false
        }
    }
}
