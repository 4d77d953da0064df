//! Per-account concurrency gate.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use fundlock_common::{AccountId, Amount};

use crate::account::AccountState;

/// One account's serialization slot.
///
/// `state` is the gate: at most one of {deposit, authorize, commit,
/// release, expiry sweep} holds it at any instant. tokio's mutex queues
/// waiters in FIFO order, so no caller starves, and the guard is released
/// on unwind, so a panicking critical section cannot wedge the account.
///
/// `balance` mirrors `state`'s committed balance and is written only by
/// gate holders; balance queries read it without queuing on the gate and
/// may observe a slightly stale but never torn value.
pub struct AccountSlot {
    pub(crate) state: Mutex<AccountState>,
    pub(crate) balance: AtomicI64,
}

impl AccountSlot {
    fn new() -> Self {
        Self {
            state: Mutex::new(AccountState::new()),
            balance: AtomicI64::new(0),
        }
    }

    /// Lock-free snapshot of the committed balance.
    pub fn balance_snapshot(&self) -> Amount {
        Amount::new(self.balance.load(Ordering::Acquire))
    }

    /// Publish the committed balance. Callers must hold the state lock.
    pub(crate) fn publish_balance(&self, balance: Amount) {
        self.balance.store(balance.minor_units(), Ordering::Release);
    }
}

/// Map from account ID to its serialization slot, created lazily on
/// first touch. Operations on distinct accounts never contend.
pub struct AccountGates {
    slots: DashMap<AccountId, Arc<AccountSlot>>,
}

impl AccountGates {
    /// Create an empty gate map.
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Get the slot for an account, creating it on first use.
    pub fn slot(&self, account_id: &AccountId) -> Arc<AccountSlot> {
        if let Some(slot) = self.slots.get(account_id) {
            return slot.clone();
        }
        self.slots
            .entry(account_id.clone())
            .or_insert_with(|| Arc::new(AccountSlot::new()))
            .clone()
    }

    /// Committed balance snapshot; zero for accounts never touched.
    pub fn balance_snapshot(&self, account_id: &AccountId) -> Amount {
        self.slots
            .get(account_id)
            .map(|slot| slot.balance_snapshot())
            .unwrap_or(Amount::ZERO)
    }

    /// IDs of every account with a slot. The sweep iterates this.
    pub fn account_ids(&self) -> Vec<AccountId> {
        self.slots.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of known accounts.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no account has been touched yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for AccountGates {
    fn default() -> Self {
        Self::new()
    }
}
