//! The load driver: rate-limited, concurrent request issuance with an
//! expected-balance mirror.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use clap::ValueEnum;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use reqwest::StatusCode;
use tracing::{info, warn};
use uuid::Uuid;

use fundlock_common::{now, AccountId};
use fundlock_server::wire::{AuthorizeResponse, TransactionRequest, WireTransactionKind};

use crate::scenario::{PlannedKind, PlannedTransaction, Scenario};
use crate::stats::RunStats;

/// When granted authorizations are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CommitMode {
    /// Commit each authorization as soon as it is granted.
    Instant,
    /// Queue all commits and send them after the main batch drains.
    End,
    /// Never commit; authorized holds are left to expire.
    Lazy,
}

/// Driver options.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Maximum requests per second; 0 disables pacing.
    pub rate: u32,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Commit timing.
    pub mode: CommitMode,
    /// Server base URL.
    pub base_url: String,
}

/// Result of one load run.
pub struct RunReport {
    /// Latency and timeout statistics.
    pub stats: RunStats,
    /// The client-side balance mirror, keyed by account.
    pub expected_balances: HashMap<AccountId, i64>,
}

impl RunReport {
    /// Persist the mirror as `{accountId: expectedBalance}` JSON under
    /// `out_dir`, returning the file path.
    pub async fn persist_expected_balances(&self, out_dir: &str) -> anyhow::Result<String> {
        let map: HashMap<String, i64> = self
            .expected_balances
            .iter()
            .map(|(account, balance)| (account.to_string(), *balance))
            .collect();

        tokio::fs::create_dir_all(out_dir).await?;
        let path = format!("{}/{}.json", out_dir, Uuid::new_v4());
        tokio::fs::write(&path, serde_json::to_vec_pretty(&map)?).await?;
        Ok(path)
    }
}

/// What came back for one issued request.
enum Completion {
    /// The server responded within the timeout.
    Responded {
        status: StatusCode,
        latency_ms: u64,
        hold_id: Option<fundlock_common::HoldId>,
    },
    /// No response within the timeout. Counted as a timeout, not as a
    /// ledger failure.
    TimedOut,
    /// Transport-level failure (connection refused, protocol error).
    Failed(String),
}

/// Issues a scenario's transactions at a bounded rate.
pub struct Driver {
    client: reqwest::Client,
    options: DriverOptions,
    window: SlidingWindow,
    stats: RunStats,
    expected: HashMap<AccountId, i64>,
    sent: u64,
}

impl Driver {
    /// Create a driver.
    pub fn new(options: DriverOptions) -> Self {
        let window = SlidingWindow::new(options.rate);
        Self {
            client: reqwest::Client::new(),
            options,
            window,
            stats: RunStats::new(),
            expected: HashMap::new(),
            sent: 0,
        }
    }

    /// Run the scenario to completion and return the report.
    pub async fn run(mut self, scenario: Scenario) -> RunReport {
        let started = Instant::now();

        let deferred = self.run_batch(scenario.transactions).await;

        match self.options.mode {
            CommitMode::End => {
                if !deferred.is_empty() {
                    info!(count = deferred.len(), "Committing deferred withdrawals");
                    let leftover = self.run_batch(deferred).await;
                    debug_assert!(leftover.is_empty());
                }
            }
            CommitMode::Lazy => {
                if !deferred.is_empty() {
                    info!(
                        count = deferred.len(),
                        "Leaving authorized withdrawals uncommitted; their holds will expire"
                    );
                }
            }
            CommitMode::Instant => {}
        }

        self.stats.duration = started.elapsed();
        RunReport {
            stats: self.stats,
            expected_balances: self.expected,
        }
    }

    /// Issue one batch of transactions. Granted authorizations turn into
    /// commits: re-queued immediately in `Instant` mode, returned as the
    /// deferred batch otherwise.
    async fn run_batch(&mut self, transactions: Vec<PlannedTransaction>) -> Vec<PlannedTransaction> {
        let mut queue: VecDeque<PlannedTransaction> = transactions.into();
        let mut deferred = Vec::new();
        let mut in_flight = FuturesUnordered::new();

        loop {
            while let Some(tx) = queue.pop_front() {
                // Absorb finished requests without stalling the send loop.
                while let Some(Some((done, completion))) = in_flight.next().now_or_never() {
                    self.absorb(done, completion, &mut queue, &mut deferred);
                }

                self.window.acquire().await;
                self.note_sent(&tx);

                let client = self.client.clone();
                let base_url = self.options.base_url.clone();
                let timeout = self.options.timeout;
                in_flight.push(async move {
                    let completion = send_transaction(&client, &base_url, timeout, &tx).await;
                    (tx, completion)
                });
            }

            match in_flight.next().await {
                Some((done, completion)) => {
                    self.absorb(done, completion, &mut queue, &mut deferred)
                }
                None => break,
            }
        }

        deferred
    }

    /// Update the expected-balance mirror at send time, the same way the
    /// ledger will apply the request if it lands. A timed-out request
    /// stays in the mirror; reconciliation happens in `check`.
    fn note_sent(&mut self, tx: &PlannedTransaction) {
        match tx.kind {
            PlannedKind::Deposit => {
                *self.expected.entry(tx.account_id.clone()).or_insert(0) +=
                    tx.amount.minor_units();
            }
            PlannedKind::WithdrawRequest => {}
            PlannedKind::Withdraw { .. } => {
                *self.expected.entry(tx.account_id.clone()).or_insert(0) -=
                    tx.amount.minor_units();
            }
        }

        self.sent += 1;
        if self.sent % 100 == 0 {
            info!("Sent {} requests", self.sent);
        }
    }

    /// Fold one completion into the stats and schedule follow-up commits
    /// for granted authorizations.
    fn absorb(
        &mut self,
        tx: PlannedTransaction,
        completion: Completion,
        queue: &mut VecDeque<PlannedTransaction>,
        deferred: &mut Vec<PlannedTransaction>,
    ) {
        match completion {
            Completion::Responded {
                status,
                latency_ms,
                hold_id,
            } => {
                self.stats.record_success(latency_ms);

                if matches!(tx.kind, PlannedKind::WithdrawRequest)
                    && status == StatusCode::CREATED
                {
                    if let Some(hold_id) = hold_id {
                        let commit =
                            PlannedTransaction::withdraw(tx.account_id.clone(), tx.amount, hold_id);
                        match self.options.mode {
                            CommitMode::Instant => queue.push_front(commit),
                            CommitMode::End | CommitMode::Lazy => deferred.push(commit),
                        }
                    }
                }
            }
            Completion::TimedOut => self.stats.record_timeout(),
            Completion::Failed(err) => {
                warn!(error = %err, "Request failed");
                self.stats.record_timeout();
            }
        }
    }
}

/// Send one transaction, racing the configured timeout.
async fn send_transaction(
    client: &reqwest::Client,
    base_url: &str,
    timeout: Duration,
    tx: &PlannedTransaction,
) -> Completion {
    let request = TransactionRequest {
        id: Uuid::new_v4().to_string(),
        kind: match tx.kind {
            PlannedKind::Deposit => WireTransactionKind::Deposit,
            PlannedKind::WithdrawRequest => WireTransactionKind::WithdrawRequest,
            PlannedKind::Withdraw { .. } => WireTransactionKind::Withdraw,
        },
        amount: tx.amount,
        account_id: tx.account_id.clone(),
        timestamp: now(),
        hold_id: match tx.kind {
            PlannedKind::Withdraw { hold_id } => Some(hold_id),
            _ => None,
        },
    };

    let started = Instant::now();
    let send = async {
        let response = client
            .post(format!("{base_url}/transaction"))
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let hold_id = if status == StatusCode::CREATED {
            response
                .json::<AuthorizeResponse>()
                .await
                .ok()
                .map(|r| r.hold_id)
        } else {
            None
        };
        Ok::<_, reqwest::Error>((status, hold_id))
    };

    match tokio::time::timeout(timeout, send).await {
        Ok(Ok((status, hold_id))) => Completion::Responded {
            status,
            latency_ms: started.elapsed().as_millis() as u64,
            hold_id,
        },
        Ok(Err(err)) => Completion::Failed(err.to_string()),
        Err(_) => Completion::TimedOut,
    }
}

/// Sliding one-second-window pacer: at most `capacity` sends in any
/// trailing second.
struct SlidingWindow {
    capacity: usize,
    sends: VecDeque<Instant>,
}

impl SlidingWindow {
    fn new(capacity: u32) -> Self {
        Self {
            capacity: capacity as usize,
            sends: VecDeque::with_capacity(capacity as usize),
        }
    }

    /// Wait until another send fits in the window, then claim the slot.
    async fn acquire(&mut self) {
        if self.capacity == 0 {
            return;
        }

        loop {
            let now = Instant::now();
            while self
                .sends
                .front()
                .is_some_and(|&t| now.duration_since(t) >= Duration::from_secs(1))
            {
                self.sends.pop_front();
            }

            if self.sends.len() < self.capacity {
                self.sends.push_back(now);
                return;
            }

            let oldest = self.sends[0];
            let wait = Duration::from_secs(1).saturating_sub(now.duration_since(oldest));
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundlock_common::{Amount, HoldId};

    fn test_driver(mode: CommitMode) -> Driver {
        Driver::new(DriverOptions {
            rate: 0,
            timeout: Duration::from_secs(3),
            mode,
            base_url: "http://localhost:0".to_string(),
        })
    }

    #[test]
    fn test_mirror_tracks_deposits_and_commits_only() {
        let mut driver = test_driver(CommitMode::Instant);
        let account = AccountId::new("acct-1");

        driver.note_sent(&PlannedTransaction::deposit(account.clone(), 100));
        driver.note_sent(&PlannedTransaction::withdraw_request(account.clone(), 40));
        assert_eq!(driver.expected[&account], 100);

        driver.note_sent(&PlannedTransaction::withdraw(
            account.clone(),
            Amount::new(40),
            HoldId::new(),
        ));
        assert_eq!(driver.expected[&account], 60);
    }

    #[test]
    fn test_granted_authorization_schedules_commit() {
        let account = AccountId::new("acct-1");
        let auth = PlannedTransaction::withdraw_request(account.clone(), 40);
        let granted = Completion::Responded {
            status: StatusCode::CREATED,
            latency_ms: 5,
            hold_id: Some(HoldId::new()),
        };

        let mut queue = VecDeque::new();
        let mut deferred = Vec::new();

        let mut driver = test_driver(CommitMode::Instant);
        driver.absorb(auth.clone(), granted, &mut queue, &mut deferred);
        assert_eq!(queue.len(), 1);
        assert!(matches!(queue[0].kind, PlannedKind::Withdraw { .. }));
        assert!(deferred.is_empty());

        let mut queue = VecDeque::new();
        let mut deferred = Vec::new();
        let granted = Completion::Responded {
            status: StatusCode::CREATED,
            latency_ms: 5,
            hold_id: Some(HoldId::new()),
        };
        let mut driver = test_driver(CommitMode::End);
        driver.absorb(auth, granted, &mut queue, &mut deferred);
        assert!(queue.is_empty());
        assert_eq!(deferred.len(), 1);
    }

    #[test]
    fn test_refused_authorization_schedules_nothing() {
        let account = AccountId::new("acct-1");
        let auth = PlannedTransaction::withdraw_request(account, 40);
        let refused = Completion::Responded {
            status: StatusCode::PAYMENT_REQUIRED,
            latency_ms: 5,
            hold_id: None,
        };

        let mut queue = VecDeque::new();
        let mut deferred = Vec::new();
        let mut driver = test_driver(CommitMode::Instant);
        driver.absorb(auth, refused, &mut queue, &mut deferred);

        assert!(queue.is_empty());
        assert!(deferred.is_empty());
        assert_eq!(driver.stats.successful_requests, 1);
    }

    #[tokio::test]
    async fn test_sliding_window_paces_sends() {
        let mut window = SlidingWindow::new(2);

        let started = Instant::now();
        window.acquire().await;
        window.acquire().await;
        assert!(started.elapsed() < Duration::from_millis(100));

        // Third send must wait for the window to slide.
        window.acquire().await;
        assert!(started.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_zero_rate_disables_pacing() {
        let mut window = SlidingWindow::new(0);
        let started = Instant::now();
        for _ in 0..1000 {
            window.acquire().await;
        }
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
