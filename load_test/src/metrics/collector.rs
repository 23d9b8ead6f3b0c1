//! Stats collector - thread-safe aggregation of request outcomes for one run

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use parking_lot::{Mutex, RwLock};
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

use super::types::{
    JourneyOutcome, JourneyStats, LatencyStats, RequestStats, StatsSnapshot, SystemMetrics,
};
use crate::outcome::{RequestOutcome, Verdict};

/// Aggregate statistics shared by every virtual user of a run.
///
/// Totals are plain atomics so concurrent users never lose an increment; the
/// keyed breakdowns sit behind short-lived mutexes. Cloning is cheap and all
/// clones observe the same run.
#[derive(Clone)]
pub struct StatsCollector {
    inner: Arc<Inner>,
}

struct Inner {
    requests: AtomicU64,
    failures: AtomicU64,
    response_ms: AtomicU64,
    /// Requests cut off by the run stopping; kept out of the totals
    abandoned: AtomicU64,
    endpoints: Mutex<HashMap<String, RequestStats>>,
    failure_reasons: Mutex<HashMap<String, u64>>,
    labels: Mutex<HashMap<String, u64>>,
    latencies: Mutex<Histogram<u64>>,
    journeys: Mutex<JourneyStats>,
    system: Mutex<System>,
    system_metrics: RwLock<SystemMetrics>,
    started_at: RwLock<Instant>,
    stopped_at: RwLock<Option<Instant>>,
}

impl StatsCollector {
    pub fn new() -> Self {
        // 3 significant digits, auto-resizing
        let latencies = Histogram::new(3).expect("Failed to create latency histogram");

        let system = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );

        Self {
            inner: Arc::new(Inner {
                requests: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                response_ms: AtomicU64::new(0),
                abandoned: AtomicU64::new(0),
                endpoints: Mutex::new(HashMap::new()),
                failure_reasons: Mutex::new(HashMap::new()),
                labels: Mutex::new(HashMap::new()),
                latencies: Mutex::new(latencies),
                journeys: Mutex::new(JourneyStats::default()),
                system: Mutex::new(system),
                system_metrics: RwLock::new(SystemMetrics::default()),
                started_at: RwLock::new(Instant::now()),
                stopped_at: RwLock::new(None),
            }),
        }
    }

    /// Reset all counters and stamp the run start
    pub fn start(&self) {
        let inner = &self.inner;
        inner.requests.store(0, Ordering::SeqCst);
        inner.failures.store(0, Ordering::SeqCst);
        inner.response_ms.store(0, Ordering::SeqCst);
        inner.abandoned.store(0, Ordering::SeqCst);
        inner.endpoints.lock().clear();
        inner.failure_reasons.lock().clear();
        inner.labels.lock().clear();
        inner.latencies.lock().reset();
        *inner.journeys.lock() = JourneyStats::default();
        *inner.started_at.write() = Instant::now();
        *inner.stopped_at.write() = None;
    }

    /// Stamp the run stop; elapsed time is frozen from here on
    pub fn finalize(&self) -> StatsSnapshot {
        self.inner.stopped_at.write().get_or_insert_with(Instant::now);
        self.update_system_metrics();
        self.snapshot()
    }

    pub fn is_finalized(&self) -> bool {
        self.inner.stopped_at.read().is_some()
    }

    /// Fold one request outcome into the aggregates
    pub fn record(&self, outcome: &RequestOutcome) {
        let response_ms = outcome.elapsed.as_millis() as u64;
        let failed = !outcome.is_success();

        self.inner.requests.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.inner.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.inner.response_ms.fetch_add(response_ms, Ordering::Relaxed);

        self.inner
            .endpoints
            .lock()
            .entry(outcome.key())
            .or_default()
            .record(response_ms, failed);

        match &outcome.verdict {
            Verdict::Success { label: Some(label) } => {
                *self.inner.labels.lock().entry(label.clone()).or_insert(0) += 1;
            }
            Verdict::Success { label: None } => {}
            Verdict::Failure { reason } => {
                *self
                    .inner
                    .failure_reasons
                    .lock()
                    .entry(reason.clone())
                    .or_insert(0) += 1;
            }
        }

        let _ = self.inner.latencies.lock().record(response_ms);
    }

    /// Count a request that never got a response because its user was stopped
    pub fn record_abandoned(&self) {
        self.inner.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn journey_started(&self) {
        self.inner.journeys.lock().started += 1;
    }

    pub fn journey_finished(&self, outcome: JourneyOutcome) {
        let mut journeys = self.inner.journeys.lock();
        match outcome {
            JourneyOutcome::Completed => journeys.completed += 1,
            JourneyOutcome::Bounced => journeys.bounced += 1,
            JourneyOutcome::Unresolved => journeys.unresolved += 1,
            JourneyOutcome::Failed => journeys.failed += 1,
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.inner.requests.load(Ordering::SeqCst)
    }

    pub fn total_failures(&self) -> u64 {
        self.inner.failures.load(Ordering::SeqCst)
    }

    /// Average response time in milliseconds across all requests
    pub fn avg_response_ms(&self) -> f64 {
        let requests = self.total_requests();
        if requests == 0 {
            0.0
        } else {
            self.inner.response_ms.load(Ordering::SeqCst) as f64 / requests as f64
        }
    }

    /// Update load generator CPU and memory figures
    pub fn update_system_metrics(&self) {
        let mut system = self.inner.system.lock();
        system.refresh_cpu_all();
        system.refresh_memory();

        let mut metrics = self.inner.system_metrics.write();
        metrics.cpu_usage = system.global_cpu_usage();
        metrics.memory_used_mb = system.used_memory() / 1024 / 1024;
        metrics.memory_total_mb = system.total_memory() / 1024 / 1024;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let endpoints: BTreeMap<String, RequestStats> = self
            .inner
            .endpoints
            .lock()
            .iter()
            .map(|(key, stats)| (key.clone(), stats.clone()))
            .collect();

        let total = RequestStats {
            requests: self.total_requests(),
            failures: self.total_failures(),
            total_response_ms: self.inner.response_ms.load(Ordering::SeqCst),
            min_response_ms: endpoints
                .values()
                .filter_map(|stats| stats.min_response_ms)
                .min(),
            max_response_ms: endpoints
                .values()
                .map(|stats| stats.max_response_ms)
                .max()
                .unwrap_or(0),
        };

        let failure_reasons = self
            .inner
            .failure_reasons
            .lock()
            .iter()
            .map(|(reason, count)| (reason.clone(), *count))
            .collect();
        let labels = self
            .inner
            .labels
            .lock()
            .iter()
            .map(|(label, count)| (label.clone(), *count))
            .collect();

        StatsSnapshot {
            total,
            endpoints,
            failure_reasons,
            labels,
            abandoned: self.inner.abandoned.load(Ordering::SeqCst),
            journeys: self.inner.journeys.lock().clone(),
            system: self.inner.system_metrics.read().clone(),
            elapsed: self.elapsed(),
        }
    }

    pub fn latency_percentiles(&self) -> LatencyStats {
        let hist = self.inner.latencies.lock();
        LatencyStats {
            min: hist.min(),
            p50: hist.value_at_quantile(0.50),
            p95: hist.value_at_quantile(0.95),
            p99: hist.value_at_quantile(0.99),
            max: hist.max(),
            mean: hist.mean(),
            count: hist.len(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        let started_at = *self.inner.started_at.read();
        match *self.inner.stopped_at.read() {
            Some(stopped_at) => stopped_at.saturating_duration_since(started_at),
            None => started_at.elapsed(),
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}
