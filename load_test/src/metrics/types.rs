//! Metric types

use std::collections::BTreeMap;
use std::time::Duration;

/// Per-endpoint (or whole-run) request counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestStats {
    pub requests: u64,
    pub failures: u64,
    pub total_response_ms: u64,
    pub min_response_ms: Option<u64>,
    pub max_response_ms: u64,
}

impl RequestStats {
    pub fn record(&mut self, response_ms: u64, failed: bool) {
        self.requests += 1;
        if failed {
            self.failures += 1;
        }
        self.total_response_ms += response_ms;
        self.min_response_ms = Some(
            self.min_response_ms
                .map_or(response_ms, |min| min.min(response_ms)),
        );
        self.max_response_ms = self.max_response_ms.max(response_ms);
    }

    pub fn successes(&self) -> u64 {
        self.requests - self.failures
    }

    pub fn avg_response_ms(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.total_response_ms as f64 / self.requests as f64
        }
    }

    pub fn failure_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.failures as f64 / self.requests as f64
        }
    }
}

/// How a single `journey` task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JourneyOutcome {
    /// Seat page loaded and completion accepted
    Completed,
    /// Join redirected back to the entry page
    Bounced,
    /// Poll budget ran out before admission
    Unresolved,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JourneyStats {
    pub started: u64,
    pub completed: u64,
    pub bounced: u64,
    pub unresolved: u64,
    pub failed: u64,
}

impl JourneyStats {
    pub fn finished(&self) -> u64 {
        self.completed + self.bounced + self.unresolved + self.failed
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemMetrics {
    pub cpu_usage: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
}

#[derive(Debug, Clone)]
pub struct LatencyStats {
    pub min: u64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub max: u64,
    pub mean: f64,
    pub count: u64,
}

/// Point-in-time copy of everything the collector knows
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    pub total: RequestStats,
    pub endpoints: BTreeMap<String, RequestStats>,
    pub failure_reasons: BTreeMap<String, u64>,
    pub labels: BTreeMap<String, u64>,
    /// Requests cut off at stop; not part of `total`
    pub abandoned: u64,
    pub journeys: JourneyStats,
    pub system: SystemMetrics,
    pub elapsed: Duration,
}

impl StatsSnapshot {
    /// Requests per second over the elapsed run time
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total.requests as f64 / secs
        } else {
            0.0
        }
    }

    /// Abandoned requests do not count against the run
    pub fn passed(&self) -> bool {
        self.total.failures == 0
    }
}
