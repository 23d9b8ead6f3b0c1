//! Entry page and join submission.

use crate::client::location;
use crate::error::HarnessError;
use crate::tasks::TaskContext;

pub const ENTRY_PATH: &str = "/entry";
pub const JOIN_PATH: &str = "/entry/join";
pub const WAITING_ROOM_PATH: &str = "/entry/waiting";
pub const SEAT_PATH: &str = "/seat";

/// Banner text the entry page shows when users go straight to seat selection
const IMMEDIATE_ENTRY_MARKER: &str = "바로 입장 가능";
/// Banner text the entry page shows while the queue is active
const QUEUE_MODE_MARKER: &str = "대기열 입장";

/// Where a join submission sent the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinDisposition {
    /// Redirected to the waiting room
    Queued(String),
    /// Redirected straight to seat selection
    Admitted(String),
    /// Redirected back to the entry page (join rejected)
    Bounced(String),
}

impl JoinDisposition {
    pub fn label(&self) -> &'static str {
        match self {
            JoinDisposition::Queued(_) => "queued",
            JoinDisposition::Admitted(_) => "admitted",
            JoinDisposition::Bounced(_) => "bounced",
        }
    }

    pub fn location(&self) -> &str {
        match self {
            JoinDisposition::Queued(location)
            | JoinDisposition::Admitted(location)
            | JoinDisposition::Bounced(location) => location,
        }
    }
}

/// Classify a join redirect by its `Location` header.
///
/// The waiting-room path is checked before the entry path since it contains it.
pub fn classify_redirect(location: &str) -> Result<JoinDisposition, HarnessError> {
    if location.contains(WAITING_ROOM_PATH) {
        Ok(JoinDisposition::Queued(location.to_string()))
    } else if location.contains(SEAT_PATH) {
        Ok(JoinDisposition::Admitted(location.to_string()))
    } else if location.contains(ENTRY_PATH) {
        Ok(JoinDisposition::Bounced(location.to_string()))
    } else {
        Err(HarnessError::UnexpectedRedirect(location.to_string()))
    }
}

/// How strictly a join redirect is judged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPolicy {
    /// Unknown redirect targets are failures
    Strict,
    /// Any 302/303 is a success
    AnyRedirect,
}

pub fn is_redirect(status: u16) -> bool {
    matches!(status, 302 | 303)
}

/// POST the join form without following the redirect
pub async fn submit_join(
    ctx: &TaskContext<'_>,
    user_id: u64,
    policy: JoinPolicy,
) -> Option<JoinDisposition> {
    let mut check = ctx.recorder.begin("POST", JOIN_PATH);
    let form = [("userId", user_id.to_string())];

    let response = match ctx.client.post_form(JOIN_PATH, &form).await {
        Ok(response) => response,
        Err(e) => {
            check.failure(&e);
            return None;
        }
    };

    let status = response.status().as_u16();
    check.respond(status);

    if !is_redirect(status) {
        tracing::debug!("[{}] join submit failed: {}", user_id, status);
        check.failure(&HarnessError::unexpected_status("non-redirect status", status));
        return None;
    }

    let target = location(&response);
    match classify_redirect(&target) {
        Ok(disposition) => {
            tracing::debug!("[{}] join {}: {}", user_id, disposition.label(), target);
            check.success_as(disposition.label());
            Some(disposition)
        }
        Err(e) => match policy {
            JoinPolicy::Strict => {
                tracing::warn!("[{}] {}", user_id, e);
                check.failure(&e);
                None
            }
            JoinPolicy::AnyRedirect => {
                tracing::debug!("[{}] join redirected elsewhere: {}", user_id, target);
                check.success_as("other");
                None
            }
        },
    }
}

/// What the entry page announced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPageMode {
    ImmediateEntry,
    QueueMode,
    Plain,
}

impl EntryPageMode {
    pub fn label(&self) -> &'static str {
        match self {
            EntryPageMode::ImmediateEntry => "entry-immediate",
            EntryPageMode::QueueMode => "entry-queue-mode",
            EntryPageMode::Plain => "entry-loaded",
        }
    }
}

pub fn classify_entry_page(body: &str) -> EntryPageMode {
    if body.contains(IMMEDIATE_ENTRY_MARKER) {
        EntryPageMode::ImmediateEntry
    } else if body.contains(QUEUE_MODE_MARKER) {
        EntryPageMode::QueueMode
    } else {
        EntryPageMode::Plain
    }
}

/// GET the entry page; any 200 is a success, labelled by page content
pub async fn load_entry_page(ctx: &TaskContext<'_>, user_id: u64) -> Option<EntryPageMode> {
    let mut check = ctx.recorder.begin("GET", ENTRY_PATH);

    let response = match ctx.client.get(ENTRY_PATH).await {
        Ok(response) => response,
        Err(e) => {
            check.failure(&e);
            return None;
        }
    };

    let status = response.status().as_u16();
    check.respond(status);
    if status != 200 {
        tracing::debug!("[{}] entry page failed: {}", user_id, status);
        check.failure(&HarnessError::unexpected_status("entry page status", status));
        return None;
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            check.failure(&HarnessError::from(e));
            return None;
        }
    };

    let mode = classify_entry_page(&body);
    tracing::debug!("[{}] entry page loaded ({})", user_id, mode.label());
    check.success_as(mode.label());
    Some(mode)
}
