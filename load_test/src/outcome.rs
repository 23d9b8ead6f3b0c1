//! Per-request outcome classification.
//!
//! Every dispatched request is wrapped in a [`ResponseCheck`] before it is
//! sent. The check is consumed by exactly one judgment (`success`,
//! `success_as` or `failure`); if it goes out of scope unjudged, `Drop`
//! records a fallback outcome instead, so each request lands in the stats
//! exactly once whichever branch a task takes. A check dropped before any
//! response arrived belongs to a user stopped mid-request and is only
//! counted as abandoned.

use std::time::{Duration, Instant};

use crate::error::HarnessError;
use crate::metrics::collector::StatsCollector;

/// Success or failure judgment for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Success { label: Option<String> },
    Failure { reason: String },
}

impl Verdict {
    pub fn success() -> Self {
        Verdict::Success { label: None }
    }

    pub fn labelled(label: impl Into<String>) -> Self {
        Verdict::Success {
            label: Some(label.into()),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Verdict::Failure {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub method: &'static str,
    /// Stats name; parameterised paths are collapsed (`/entry/api/rank/[userId]`)
    pub name: String,
    pub status: Option<u16>,
    pub elapsed: Duration,
    pub verdict: Verdict,
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.verdict, Verdict::Success { .. })
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::Failure { reason } => Some(reason),
            Verdict::Success { .. } => None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::Success { label } => label.as_deref(),
            Verdict::Failure { .. } => None,
        }
    }

    /// Key used for the per-endpoint breakdown
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.name)
    }
}

/// Receives every request outcome of a run.
///
/// Holds the run's [`StatsCollector`] and logs noteworthy outcomes.
#[derive(Clone)]
pub struct RequestRecorder {
    stats: StatsCollector,
    slow_threshold: Duration,
}

impl RequestRecorder {
    pub fn new(stats: StatsCollector, slow_threshold: Duration) -> Self {
        Self {
            stats,
            slow_threshold,
        }
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }

    /// Open a check for a request about to be sent
    pub fn begin(&self, method: &'static str, name: impl Into<String>) -> ResponseCheck<'_> {
        ResponseCheck {
            recorder: self,
            method,
            name: name.into(),
            started: Instant::now(),
            status: None,
            elapsed: None,
            judged: false,
        }
    }

    pub fn on_request(&self, outcome: &RequestOutcome) {
        if outcome.elapsed > self.slow_threshold {
            tracing::warn!(
                "{} {} - slow response: {}ms",
                outcome.method,
                outcome.name,
                outcome.elapsed.as_millis()
            );
        }

        self.stats.record(outcome);
    }
}

/// Scoped judgment for one in-flight request
pub struct ResponseCheck<'a> {
    recorder: &'a RequestRecorder,
    method: &'static str,
    name: String,
    started: Instant,
    status: Option<u16>,
    elapsed: Option<Duration>,
    judged: bool,
}

impl ResponseCheck<'_> {
    /// Note the response status and stop the response clock
    pub fn respond(&mut self, status: u16) {
        self.status = Some(status);
        self.elapsed = Some(self.started.elapsed());
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn success(mut self) {
        self.judge(Verdict::success());
    }

    pub fn success_as(mut self, label: impl Into<String>) {
        self.judge(Verdict::labelled(label));
    }

    pub fn failure(mut self, error: &HarnessError) {
        if error.is_network() {
            tracing::error!("{} {} - error: {}", self.method, self.name, error);
        }
        self.judge(Verdict::failure(error.to_string()));
    }

    fn judge(&mut self, verdict: Verdict) {
        if self.judged {
            return;
        }
        self.judged = true;

        let outcome = RequestOutcome {
            method: self.method,
            name: std::mem::take(&mut self.name),
            status: self.status,
            elapsed: self.elapsed.unwrap_or_else(|| self.started.elapsed()),
            verdict,
        };
        self.recorder.on_request(&outcome);
    }
}

impl Drop for ResponseCheck<'_> {
    fn drop(&mut self) {
        if self.judged {
            return;
        }
        let verdict = match self.status {
            Some(status) if status < 400 => Verdict::success(),
            Some(status) => Verdict::failure(format!("unjudged error status: {}", status)),
            None => {
                self.judged = true;
                tracing::debug!("{} {} - abandoned", self.method, self.name);
                self.recorder.stats.record_abandoned();
                return;
            }
        };
        self.judge(verdict);
    }
}
