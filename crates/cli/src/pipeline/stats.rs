//! Relay statistics.

use std::time::Duration;

use dispatcher::RouteReport;

use crate::commands::format_iec;

/// Statistics from a relay run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Inbound counters
    pub inbound: ingestion::MetricsSnapshot,

    /// One report per route, in configuration order
    pub routes: Vec<RouteReport>,
}

impl PipelineStats {
    /// Inbound throughput in bytes per second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.inbound.bytes as f64 / secs
        } else {
            0.0
        }
    }

    /// Chunks lost across all routes
    pub fn total_dropped(&self) -> u64 {
        self.routes.iter().map(|r| r.metrics.dropped_count).sum()
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Relay Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Inbound");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Reads: {}", self.inbound.reads);
        println!("   ├─ Bytes: {}", format_iec(self.inbound.bytes));
        println!("   ├─ Throughput: {}/s", format_iec(self.throughput() as u64));
        println!("   ├─ Connections: {}", self.inbound.connections);
        println!("   └─ Receive errors: {}", self.inbound.read_errors);

        println!("\n📤 Routes (dropped total: {})", self.total_dropped());
        for (i, report) in self.routes.iter().enumerate() {
            let is_last = i == self.routes.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            let child = if is_last { "   " } else { "│  " };
            let m = &report.metrics;

            println!("   {} {} ({})", prefix, report.name, m.state);
            println!(
                "   {}  ├─ Sent: {} chunks, {}",
                child,
                m.sent_count,
                format_iec(m.sent_bytes)
            );
            println!(
                "   {}  ├─ Accepted/dropped: {}/{}",
                child, m.accepted_count, m.dropped_count
            );
            match &report.emit_lag_ms {
                Some(lag) => {
                    println!("   {}  ├─ Send failures: {}", child, m.failure_count);
                    println!("   {}  └─ Emit lag (ms): {}", child, lag);
                }
                None => println!("   {}  └─ Send failures: {}", child, m.failure_count),
            }
        }

        println!();
    }
}
