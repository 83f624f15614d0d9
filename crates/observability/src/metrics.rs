//! Relay metric recorders
//!
//! Thin wrappers over the `metrics` facade so every crate uses the same
//! metric names and labels. Without an installed recorder they are no-ops.

use metrics::{counter, gauge, histogram};

/// Record one inbound read (datagram or stream read)
pub fn record_inbound_read(protocol: &str, bytes: usize) {
    counter!("duplicate_inbound_reads_total", "protocol" => protocol.to_string()).increment(1);
    counter!("duplicate_inbound_bytes_total", "protocol" => protocol.to_string())
        .increment(bytes as u64);
}

/// Record a chunk accepted by a route sink
pub fn record_chunk_accepted(route: &str, bytes: usize) {
    counter!("duplicate_chunks_accepted_total", "route" => route.to_string()).increment(1);
    counter!("duplicate_bytes_accepted_total", "route" => route.to_string())
        .increment(bytes as u64);
}

/// Record a chunk lost to backpressure on a route
pub fn record_chunk_dropped(route: &str, reason: &'static str) {
    counter!(
        "duplicate_chunks_dropped_total",
        "route" => route.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// Record a chunk transmitted to a destination
pub fn record_chunk_sent(route: &str, bytes: usize) {
    counter!("duplicate_chunks_sent_total", "route" => route.to_string()).increment(1);
    counter!("duplicate_bytes_sent_total", "route" => route.to_string()).increment(bytes as u64);
}

/// Record a transient send failure (udp)
pub fn record_send_failure(route: &str) {
    counter!("duplicate_send_failures_total", "route" => route.to_string()).increment(1);
}

/// Record a fatal route failure
pub fn record_route_failed(route: &str) {
    counter!("duplicate_route_failures_total", "route" => route.to_string()).increment(1);
}

/// Record undrained chunks on a route
pub fn record_queue_depth(route: &str, depth: usize) {
    gauge!("duplicate_queue_depth", "route" => route.to_string()).set(depth as f64);
}

/// Record how late a chunk left compared to its schedule
pub fn record_emit_lag_ms(route: &str, lag_ms: f64) {
    histogram!("duplicate_emit_lag_ms", "route" => route.to_string()).record(lag_ms);
}

/// Summary of a `RunningStats`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        assert_eq!(StatsSummary::default().to_string(), "N/A");

        let mut stats = RunningStats::default();
        stats.push(2.0);
        stats.push(4.0);
        let output = stats.summary().to_string();
        assert!(output.contains("min=2.000"));
        assert!(output.contains("(n=2)"));
    }

    #[test]
    fn test_recorders_without_recorder_are_noops() {
        record_inbound_read("udp", 10);
        record_chunk_accepted("r", 10);
        record_chunk_dropped("r", "queue_full");
        record_chunk_sent("r", 10);
        record_send_failure("r");
        record_route_failed("r");
        record_queue_depth("r", 3);
        record_emit_lag_ms("r", 0.5);
    }
}
