//! Run statistics: latency samples, timeouts, throughput.

use std::time::Duration;

use tracing::info;

/// Statistics collected over one load run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Latency samples in milliseconds, one per completed request.
    latencies: Vec<u64>,
    /// Requests that completed within the timeout.
    pub successful_requests: u64,
    /// Requests with no response within the timeout.
    pub timeouts: u64,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl RunStats {
    /// Create empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed request.
    pub fn record_success(&mut self, latency_ms: u64) {
        self.successful_requests += 1;
        self.latencies.push(latency_ms);
    }

    /// Record a timed-out request.
    pub fn record_timeout(&mut self) {
        self.timeouts += 1;
    }

    /// Get average latency in ms.
    pub fn average_latency_ms(&self) -> u64 {
        if self.latencies.is_empty() {
            return 0;
        }
        let sum: u64 = self.latencies.iter().sum();
        sum / self.latencies.len() as u64
    }

    /// Get minimum latency in ms.
    pub fn min_latency_ms(&self) -> u64 {
        self.latencies.iter().copied().min().unwrap_or(0)
    }

    /// Get maximum latency in ms.
    pub fn max_latency_ms(&self) -> u64 {
        self.latencies.iter().copied().max().unwrap_or(0)
    }

    /// Get percentile latency.
    pub fn percentile_latency_ms(&self, percentile: usize) -> u64 {
        if self.latencies.is_empty() {
            return 0;
        }

        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();

        let idx = (sorted.len() * percentile / 100).min(sorted.len() - 1);
        sorted[idx]
    }

    /// Completed requests per second over the run.
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.latencies.len() as f64 / secs
    }

    /// Log the end-of-run summary.
    pub fn log_summary(&self) {
        info!("Run completed in {:.2} seconds", self.duration.as_secs_f64());
        info!("Successful requests: {}", self.successful_requests);
        info!("Timeouts: {}", self.timeouts);
        info!("Average latency: {}ms", self.average_latency_ms());
        info!("Minimum latency: {}ms", self.min_latency_ms());
        info!("Maximum latency: {}ms", self.max_latency_ms());
        info!("p50 latency: {}ms", self.percentile_latency_ms(50));
        info!("p99 latency: {}ms", self.percentile_latency_ms(99));
        info!("Avg RPS: {:.2}", self.throughput());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate() {
        let mut stats = RunStats::new();
        stats.record_success(100);
        stats.record_success(200);
        stats.record_success(150);
        stats.record_timeout();

        assert_eq!(stats.successful_requests, 3);
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.average_latency_ms(), 150);
        assert_eq!(stats.min_latency_ms(), 100);
        assert_eq!(stats.max_latency_ms(), 200);
    }

    #[test]
    fn test_percentiles_on_empty_stats() {
        let stats = RunStats::new();
        assert_eq!(stats.percentile_latency_ms(99), 0);
        assert_eq!(stats.average_latency_ms(), 0);
    }

    #[test]
    fn test_throughput() {
        let mut stats = RunStats::new();
        stats.record_success(10);
        stats.record_success(10);
        stats.duration = Duration::from_secs(2);
        assert!((stats.throughput() - 1.0).abs() < f64::EPSILON);
    }
}
