//! Console reporter for run statistics with real-time updates

use std::io::{self, Write};

use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::collector::StatsCollector;
use super::types::StatsSnapshot;

/// Print live stats every `interval_secs` until the run is cancelled
pub async fn start_periodic_reporter(
    collector: StatsCollector,
    interval_secs: u64,
    cancel: CancellationToken,
) {
    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // first tick fires immediately; nothing to show yet
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                collector.update_system_metrics();
                print_live_stats(&collector);
            }
        }
    }
}

/// Print live stats (clears screen and updates in place)
pub fn print_live_stats(collector: &StatsCollector) {
    print!("\x1B[2J\x1B[1;1H");

    let snapshot = collector.snapshot();
    let elapsed = snapshot.elapsed.as_secs();
    let latency = collector.latency_percentiles();

    println!("╔════════════════════════════════════════════════════════════════╗");
    println!("║             Ticketing Load Test - Live Stats                   ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    println!(
        "\n⏱️  Elapsed Time: {:02}:{:02}:{:02}",
        elapsed / 3600,
        (elapsed % 3600) / 60,
        elapsed % 60
    );

    println!("\n┌─ REQUESTS ──────────────────────────────────────────────────┐");
    println!(
        "│  Total:        {:>8}    Failed:     {:>8}              │",
        snapshot.total.requests, snapshot.total.failures
    );
    if snapshot.total.requests > 0 {
        println!(
            "│  Success Rate: {:>7.2}%    Throughput: {:>7.2}/sec        │",
            (1.0 - snapshot.total.failure_ratio()) * 100.0,
            snapshot.throughput()
        );
    }
    println!("└─────────────────────────────────────────────────────────────┘");

    if latency.count > 0 {
        println!("\n┌─ RESPONSE TIME (ms) ────────────────────────────────────────┐");
        println!(
            "│  Min: {:>6}  P50: {:>6}  P95: {:>6}  P99: {:>6}  Max: {:>6}│",
            latency.min, latency.p50, latency.p95, latency.p99, latency.max
        );
        println!(
            "│  Mean: {:>8.2} ms    Count: {:>10}                    │",
            latency.mean, latency.count
        );
        println!("└─────────────────────────────────────────────────────────────┘");
    }

    if !snapshot.labels.is_empty() {
        println!("\n┌─ OUTCOMES ──────────────────────────────────────────────────┐");
        for (label, count) in &snapshot.labels {
            println!("│  {:<24} {:>10}                         │", label, count);
        }
        println!("└─────────────────────────────────────────────────────────────┘");
    }

    println!("\n┌─ SYSTEM ────────────────────────────────────────────────────┐");
    println!(
        "│  CPU Usage:    {:>6.1}%    Memory: {:>6} / {:>6} MB       │",
        snapshot.system.cpu_usage, snapshot.system.memory_used_mb, snapshot.system.memory_total_mb
    );
    println!("└─────────────────────────────────────────────────────────────┘");

    println!("\n  [Press Ctrl+C to stop test]");

    let _ = io::stdout().flush();
}

/// Print final summary report
pub fn print_final_report(collector: &StatsCollector, snapshot: &StatsSnapshot) {
    let latency = collector.latency_percentiles();

    println!("\n╔════════════════════════════════════════════════════════════════╗");
    println!("║                    FINAL TEST REPORT                           ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    println!("\n📊 REQUESTS");
    println!("   Total Requests:       {:>10}", snapshot.total.requests);
    println!("   Total Failures:       {:>10}", snapshot.total.failures);
    println!(
        "   Avg Response Time:    {:>10.2} ms",
        snapshot.total.avg_response_ms()
    );
    println!("   Throughput:           {:>10.2} req/sec", snapshot.throughput());
    if snapshot.abandoned > 0 {
        println!("   Abandoned at stop:    {:>10}", snapshot.abandoned);
    }

    if !snapshot.endpoints.is_empty() {
        println!("\n🔗 ENDPOINTS");
        println!(
            "   {:<36} {:>8} {:>8} {:>8} {:>10}",
            "Name", "Reqs", "OK", "Fails", "Avg (ms)"
        );
        for (name, stats) in &snapshot.endpoints {
            println!(
                "   {:<36} {:>8} {:>8} {:>8} {:>10.2}",
                name,
                stats.requests,
                stats.successes(),
                stats.failures,
                stats.avg_response_ms()
            );
        }
    }

    if latency.count > 0 {
        println!("\n📈 RESPONSE TIME");
        println!("   Min:                  {:>10} ms", latency.min);
        println!("   P50 (Median):         {:>10} ms", latency.p50);
        println!("   P95:                  {:>10} ms", latency.p95);
        println!("   P99:                  {:>10} ms", latency.p99);
        println!("   Max:                  {:>10} ms", latency.max);
    }

    if !snapshot.labels.is_empty() {
        println!("\n🔀 OUTCOMES");
        for (label, count) in &snapshot.labels {
            println!("   {:<22} {:>10}", label, count);
        }
    }

    if !snapshot.failure_reasons.is_empty() {
        println!("\n❌ FAILURES");
        for (reason, count) in &snapshot.failure_reasons {
            println!("   {:>8}  {}", count, reason);
        }
    }

    if snapshot.journeys.started > 0 {
        let journeys = &snapshot.journeys;
        println!("\n🎟️  JOURNEYS");
        println!("   Started:              {:>10}", journeys.started);
        println!("   Completed:            {:>10}", journeys.completed);
        println!("   Bounced:              {:>10}", journeys.bounced);
        println!("   Unresolved:           {:>10}", journeys.unresolved);
        println!("   Failed:               {:>10}", journeys.failed);
    }

    println!(
        "\n⏱️  Test Duration: {:.2} seconds",
        snapshot.elapsed.as_secs_f64()
    );
    println!(
        "   Result: {}",
        if snapshot.passed() { "PASS" } else { "FAIL" }
    );
    println!("════════════════════════════════════════════════════════════════\n");
}
