//! The ledger engine: operation facade over the gated account states.

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use fundlock_common::{AccountId, Amount, HoldId, LedgerError, Result};

use crate::account::Hold;
use crate::config::LedgerConfig;
use crate::gate::AccountGates;
use crate::journal::{Journal, TransactionKind, TransactionRecord};

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Engine is running and accepting operations.
    Running,
    /// Engine is shutting down; mutating operations are refused.
    ShuttingDown,
    /// Engine is stopped.
    Stopped,
}

impl EngineState {
    /// Check if mutating operations are accepted.
    pub fn accepts_requests(&self) -> bool {
        matches!(self, EngineState::Running)
    }
}

/// The ledger engine.
///
/// Every mutating operation follows the same shape: check lifecycle
/// state, resolve the account's slot, take its gate, mutate the account
/// state, publish the balance mirror, append a journal record, return.
/// The gate makes check-and-reserve atomic with respect to every other
/// operation on the same account; operations on distinct accounts run
/// fully in parallel.
pub struct LedgerEngine {
    config: LedgerConfig,
    state: RwLock<EngineState>,
    gates: AccountGates,
    journal: Journal,
}

impl LedgerEngine {
    /// Create a new engine in the `Running` state.
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            state: RwLock::new(EngineState::Running),
            gates: AccountGates::new(),
            journal: Journal::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    /// Check if the engine is accepting mutating operations.
    pub fn accepts_requests(&self) -> bool {
        self.state.read().accepts_requests()
    }

    /// Begin shutdown. In-flight operations finish; new mutating calls
    /// get `Unavailable`. Balance queries keep working so clients can
    /// reconcile.
    pub fn shutdown(&self) {
        *self.state.write() = EngineState::ShuttingDown;
        info!("Ledger engine shutting down");
    }

    /// Mark the engine fully stopped.
    pub fn mark_stopped(&self) {
        *self.state.write() = EngineState::Stopped;
    }

    /// Credit an account, creating it on first use.
    pub async fn deposit(&self, account_id: &AccountId, amount: Amount) -> Result<()> {
        self.ensure_accepting()?;
        Self::validate_amount(amount)?;

        let slot = self.gates.slot(account_id);
        let mut state = slot.state.lock().await;
        state.deposit(amount);
        slot.publish_balance(state.balance());
        self.journal.record(TransactionRecord::new(
            account_id.clone(),
            TransactionKind::Deposit,
            amount,
        ));
        debug!(account = %account_id, amount = %amount, balance = %state.balance(), "Deposit applied");
        Ok(())
    }

    /// Authorize a withdrawal: atomically check available funds and
    /// reserve a hold. This is the check-and-reserve step that must never
    /// interleave with other operations on the same account.
    pub async fn authorize(&self, account_id: &AccountId, amount: Amount) -> Result<HoldId> {
        self.ensure_accepting()?;
        Self::validate_amount(amount)?;

        let slot = self.gates.slot(account_id);
        let mut state = slot.state.lock().await;
        let hold_id = state.authorize(amount, self.config.hold_ttl)?;
        self.journal.record(TransactionRecord::new(
            account_id.clone(),
            TransactionKind::Authorize,
            amount,
        ));
        debug!(
            account = %account_id,
            hold_id = %hold_id,
            amount = %amount,
            available = %state.available_to_authorize(),
            "Withdrawal authorized"
        );
        Ok(hold_id)
    }

    /// Commit a previously authorized withdrawal: debit the balance by
    /// the hold's amount and destroy the hold.
    pub async fn commit(&self, account_id: &AccountId, hold_id: HoldId) -> Result<Amount> {
        self.ensure_accepting()?;

        let slot = self.gates.slot(account_id);
        let mut state = slot.state.lock().await;
        let amount = state.commit(hold_id)?;
        slot.publish_balance(state.balance());
        self.journal.record(TransactionRecord::new(
            account_id.clone(),
            TransactionKind::Commit,
            amount,
        ));
        debug!(account = %account_id, hold_id = %hold_id, amount = %amount, "Withdrawal committed");
        Ok(amount)
    }

    /// Commit the oldest outstanding hold of exactly `amount`. Wire
    /// adapter path for commits that arrive without a hold reference.
    pub async fn commit_matching(&self, account_id: &AccountId, amount: Amount) -> Result<HoldId> {
        self.ensure_accepting()?;
        Self::validate_amount(amount)?;

        let slot = self.gates.slot(account_id);
        let mut state = slot.state.lock().await;
        let hold_id = state.oldest_hold_with_amount(amount).ok_or_else(|| {
            LedgerError::UnknownHold(format!("no active hold of {} on {}", amount, account_id))
        })?;
        state.commit(hold_id)?;
        slot.publish_balance(state.balance());
        self.journal.record(TransactionRecord::new(
            account_id.clone(),
            TransactionKind::Commit,
            amount,
        ));
        debug!(account = %account_id, hold_id = %hold_id, amount = %amount, "Withdrawal committed");
        Ok(hold_id)
    }

    /// Release a hold without debiting. Explicit cancellation path; the
    /// expiry sweep uses [`sweep_expired`](Self::sweep_expired) instead.
    pub async fn release(&self, account_id: &AccountId, hold_id: HoldId) -> Result<Amount> {
        self.ensure_accepting()?;

        let slot = self.gates.slot(account_id);
        let mut state = slot.state.lock().await;
        let amount = state.release(hold_id)?;
        self.journal.record(TransactionRecord::new(
            account_id.clone(),
            TransactionKind::Release,
            amount,
        ));
        debug!(account = %account_id, hold_id = %hold_id, amount = %amount, "Hold released");
        Ok(amount)
    }

    /// Committed balance; zero for unknown accounts. Reads the mirror
    /// without queuing on the gate, so it may trail an in-flight write
    /// but never observes a torn value.
    pub fn balance(&self, account_id: &AccountId) -> Amount {
        self.gates.balance_snapshot(account_id)
    }

    /// Number of outstanding holds on an account.
    pub async fn active_hold_count(&self, account_id: &AccountId) -> usize {
        let slot = self.gates.slot(account_id);
        let state = slot.state.lock().await;
        state.active_hold_count()
    }

    /// Audit journal.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Release every hold past its TTL, account by account, taking each
    /// account's gate so the sweep never races a late-arriving commit.
    /// Returns the holds released.
    pub async fn sweep_expired(&self) -> Vec<(AccountId, Hold)> {
        let mut released = Vec::new();

        for account_id in self.gates.account_ids() {
            let slot = self.gates.slot(&account_id);
            let mut state = slot.state.lock().await;
            for hold in state.release_expired() {
                self.journal.record(TransactionRecord::new(
                    account_id.clone(),
                    TransactionKind::Release,
                    hold.amount,
                ));
                warn!(
                    account = %account_id,
                    hold_id = %hold.id,
                    amount = %hold.amount,
                    "Hold expired"
                );
                released.push((account_id.clone(), hold));
            }
        }

        released
    }

    /// Run the expiry sweep until shutdown.
    pub async fn run_sweep_loop(&self) {
        loop {
            tokio::time::sleep(self.config.sweep_interval).await;
            if !self.accepts_requests() {
                break;
            }
            self.sweep_expired().await;
        }
    }

    fn ensure_accepting(&self) -> Result<()> {
        if !self.accepts_requests() {
            return Err(LedgerError::Unavailable);
        }
        Ok(())
    }

    fn validate_amount(amount: Amount) -> Result<()> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_engine() -> LedgerEngine {
        LedgerEngine::new(LedgerConfig::default())
    }

    #[tokio::test]
    async fn test_deposit_then_balance() {
        let engine = test_engine();
        let account = AccountId::new("acct-1");

        engine.deposit(&account, Amount::new(100_000)).await.unwrap();
        assert_eq!(engine.balance(&account), Amount::new(100_000));
    }

    #[tokio::test]
    async fn test_unknown_account_reads_zero() {
        let engine = test_engine();
        assert_eq!(engine.balance(&AccountId::new("nobody")), Amount::ZERO);
    }

    #[tokio::test]
    async fn test_invalid_amounts_rejected() {
        let engine = test_engine();
        let account = AccountId::new("acct-1");

        let err = engine.deposit(&account, Amount::ZERO).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));

        let err = engine.authorize(&account, Amount::new(-5)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
    }

    #[tokio::test]
    async fn test_balance_visible_only_after_commit() {
        let engine = test_engine();
        let account = AccountId::new("acct-1");

        engine.deposit(&account, Amount::new(100)).await.unwrap();
        let hold_id = engine.authorize(&account, Amount::new(60)).await.unwrap();

        // Authorization reserves but does not debit.
        assert_eq!(engine.balance(&account), Amount::new(100));

        engine.commit(&account, hold_id).await.unwrap();
        assert_eq!(engine.balance(&account), Amount::new(40));
    }

    #[tokio::test]
    async fn test_commit_matching_consumes_oldest() {
        let engine = test_engine();
        let account = AccountId::new("acct-1");

        engine.deposit(&account, Amount::new(200)).await.unwrap();
        let first = engine.authorize(&account, Amount::new(100)).await.unwrap();
        let second = engine.authorize(&account, Amount::new(100)).await.unwrap();

        let committed = engine
            .commit_matching(&account, Amount::new(100))
            .await
            .unwrap();
        assert_eq!(committed, first);

        // The second hold is still live and committable.
        engine.commit(&account, second).await.unwrap();
        assert_eq!(engine.balance(&account), Amount::ZERO);

        let err = engine
            .commit_matching(&account, Amount::new(100))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownHold(_)));
    }

    #[tokio::test]
    async fn test_shutdown_refuses_mutations_but_not_reads() {
        let engine = test_engine();
        let account = AccountId::new("acct-1");

        engine.deposit(&account, Amount::new(100)).await.unwrap();
        engine.shutdown();

        assert!(matches!(
            engine.deposit(&account, Amount::new(1)).await,
            Err(LedgerError::Unavailable)
        ));
        assert!(matches!(
            engine.authorize(&account, Amount::new(1)).await,
            Err(LedgerError::Unavailable)
        ));
        assert_eq!(engine.balance(&account), Amount::new(100));
    }

    #[tokio::test]
    async fn test_journal_records_every_mutation() {
        let engine = test_engine();
        let account = AccountId::new("acct-1");

        engine.deposit(&account, Amount::new(100)).await.unwrap();
        let hold_id = engine.authorize(&account, Amount::new(40)).await.unwrap();
        engine.commit(&account, hold_id).await.unwrap();

        let kinds: Vec<TransactionKind> = engine
            .journal()
            .entries_for_account(&account)
            .iter()
            .map(|r| r.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TransactionKind::Deposit,
                TransactionKind::Authorize,
                TransactionKind::Commit,
            ]
        );
    }

    #[tokio::test]
    async fn test_sweep_releases_expired_holds() {
        let engine = LedgerEngine::new(LedgerConfig {
            hold_ttl: std::time::Duration::from_millis(20),
            sweep_interval: std::time::Duration::from_millis(10),
        });
        let account = AccountId::new("acct-1");

        engine.deposit(&account, Amount::new(100)).await.unwrap();
        let hold_id = engine.authorize(&account, Amount::new(100)).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(40)).await;
        let released = engine.sweep_expired().await;
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].1.id, hold_id);

        // Balance restored to pre-authorization value; the late commit
        // must not find the hold.
        assert_eq!(engine.balance(&account), Amount::new(100));
        assert!(matches!(
            engine.commit(&account, hold_id).await,
            Err(LedgerError::UnknownHold(_))
        ));
        assert_eq!(engine.active_hold_count(&account).await, 0);
    }
}
