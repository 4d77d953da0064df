//! Request metrics for the HTTP adapter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Server request counters.
pub struct ServerMetrics {
    /// Deposits applied.
    pub deposits_total: AtomicU64,
    /// Withdrawal authorizations granted.
    pub authorizations_granted: AtomicU64,
    /// Withdrawal authorizations refused for insufficient funds.
    pub authorizations_refused: AtomicU64,
    /// Withdrawal commits applied.
    pub commits_total: AtomicU64,
    /// Commits refused (unknown or already-resolved hold).
    pub commits_refused: AtomicU64,
    /// Balance queries served.
    pub balance_queries: AtomicU64,
    /// Requests rejected before reaching the ledger (malformed body,
    /// unknown type, invalid amount).
    pub requests_rejected: AtomicU64,
}

impl ServerMetrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self {
            deposits_total: AtomicU64::new(0),
            authorizations_granted: AtomicU64::new(0),
            authorizations_refused: AtomicU64::new(0),
            commits_total: AtomicU64::new(0),
            commits_refused: AtomicU64::new(0),
            balance_queries: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
        }
    }

    /// Record an applied deposit.
    pub fn deposit_applied(&self) {
        self.deposits_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a granted authorization.
    pub fn authorization_granted(&self) {
        self.authorizations_granted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an authorization refused for insufficient funds.
    pub fn authorization_refused(&self) {
        self.authorizations_refused.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an applied commit.
    pub fn commit_applied(&self) {
        self.commits_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a refused commit.
    pub fn commit_refused(&self) {
        self.commits_refused.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a balance query.
    pub fn balance_query(&self) {
        self.balance_queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request rejected before reaching the ledger.
    pub fn request_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            deposits_total: self.deposits_total.load(Ordering::Relaxed),
            authorizations_granted: self.authorizations_granted.load(Ordering::Relaxed),
            authorizations_refused: self.authorizations_refused.load(Ordering::Relaxed),
            commits_total: self.commits_total.load(Ordering::Relaxed),
            commits_refused: self.commits_refused.load(Ordering::Relaxed),
            balance_queries: self.balance_queries.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP fundlock_deposits_total Deposits applied
# TYPE fundlock_deposits_total counter
fundlock_deposits_total {}

# HELP fundlock_authorizations_granted Withdrawal authorizations granted
# TYPE fundlock_authorizations_granted counter
fundlock_authorizations_granted {}

# HELP fundlock_authorizations_refused Authorizations refused for insufficient funds
# TYPE fundlock_authorizations_refused counter
fundlock_authorizations_refused {}

# HELP fundlock_commits_total Withdrawal commits applied
# TYPE fundlock_commits_total counter
fundlock_commits_total {}

# HELP fundlock_commits_refused Commits refused for unknown holds
# TYPE fundlock_commits_refused counter
fundlock_commits_refused {}

# HELP fundlock_balance_queries Balance queries served
# TYPE fundlock_balance_queries counter
fundlock_balance_queries {}

# HELP fundlock_requests_rejected Requests rejected before reaching the ledger
# TYPE fundlock_requests_rejected counter
fundlock_requests_rejected {}
"#,
            snapshot.deposits_total,
            snapshot.authorizations_granted,
            snapshot.authorizations_refused,
            snapshot.commits_total,
            snapshot.commits_refused,
            snapshot.balance_queries,
            snapshot.requests_rejected,
        )
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub deposits_total: u64,
    pub authorizations_granted: u64,
    pub authorizations_refused: u64,
    pub commits_total: u64,
    pub commits_refused: u64,
    pub balance_queries: u64,
    pub requests_rejected: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<ServerMetrics>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_increment() {
        let metrics = ServerMetrics::new();

        metrics.deposit_applied();
        metrics.deposit_applied();
        metrics.authorization_granted();
        metrics.authorization_refused();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.deposits_total, 2);
        assert_eq!(snapshot.authorizations_granted, 1);
        assert_eq!(snapshot.authorizations_refused, 1);
        assert_eq!(snapshot.commits_total, 0);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = ServerMetrics::new();
        metrics.deposit_applied();

        let output = metrics.to_prometheus();
        assert!(output.contains("fundlock_deposits_total 1"));
    }
}
