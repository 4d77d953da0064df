//! Per-account ledger state: committed balance plus outstanding holds.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use fundlock_common::{Amount, HoldId, LedgerError, Result};

/// A reservation against an account's balance created by a successful
/// withdrawal authorization. The hold does not reduce `balance`; it only
/// reduces what further authorizations may reserve.
#[derive(Debug, Clone)]
pub struct Hold {
    /// Unique hold ID, returned to the authorizing caller.
    pub id: HoldId,
    /// Amount reserved.
    pub amount: Amount,
    /// When the hold was created.
    pub created_at: Instant,
    /// When the hold becomes eligible for the expiry sweep.
    pub expires_at: Instant,
}

impl Hold {
    /// Create a new hold with the given time-to-live.
    pub fn new(amount: Amount, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            id: HoldId::new(),
            amount,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Check if the hold has outlived its TTL.
    pub fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// The state of one account: its committed balance and the set of active
/// holds against it.
///
/// This type is correct when called serially; callers must route every
/// access through the account's gate (see [`crate::gate`]). A hold stays
/// in `holds` until it is committed, released, or removed by the expiry
/// sweep; until then its amount counts against what may be authorized.
#[derive(Debug, Default)]
pub struct AccountState {
    balance: Amount,
    holds: HashMap<HoldId, Hold>,
}

impl AccountState {
    /// Create a fresh account with zero balance and no holds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed balance. Holds are not subtracted; they are a
    /// reservation concept, not a visible debit.
    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Sum of all outstanding hold amounts.
    pub fn held(&self) -> Amount {
        self.holds.values().map(|h| h.amount).sum()
    }

    /// Balance minus outstanding holds: the ceiling for new
    /// authorizations.
    pub fn available_to_authorize(&self) -> Amount {
        self.balance - self.held()
    }

    /// Number of outstanding holds.
    pub fn active_hold_count(&self) -> usize {
        self.holds.len()
    }

    /// Credit the balance. The caller has already validated the amount.
    pub fn deposit(&mut self, amount: Amount) {
        debug_assert!(amount.is_positive());
        self.balance = self.balance + amount;
    }

    /// Check-and-reserve: create a hold iff the solvency invariant
    /// (`balance - held >= 0`) survives it.
    pub fn authorize(&mut self, amount: Amount, ttl: Duration) -> Result<HoldId> {
        debug_assert!(amount.is_positive());
        let available = self.available_to_authorize();
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available,
            });
        }

        let hold = Hold::new(amount, ttl);
        let hold_id = hold.id;
        self.holds.insert(hold_id, hold);
        Ok(hold_id)
    }

    /// Consume a hold: debit the balance by its amount and remove it.
    /// Returns the committed amount.
    pub fn commit(&mut self, hold_id: HoldId) -> Result<Amount> {
        let hold = self
            .holds
            .remove(&hold_id)
            .ok_or_else(|| LedgerError::UnknownHold(hold_id.to_string()))?;

        self.balance = self.balance - hold.amount;
        Ok(hold.amount)
    }

    /// Discard a hold without touching the balance. Returns the released
    /// amount.
    pub fn release(&mut self, hold_id: HoldId) -> Result<Amount> {
        let hold = self
            .holds
            .remove(&hold_id)
            .ok_or_else(|| LedgerError::UnknownHold(hold_id.to_string()))?;

        Ok(hold.amount)
    }

    /// Remove every hold past its TTL and return them. Balance is
    /// untouched.
    pub fn release_expired(&mut self) -> Vec<Hold> {
        let expired: Vec<HoldId> = self
            .holds
            .values()
            .filter(|h| h.is_expired())
            .map(|h| h.id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.holds.remove(&id))
            .collect()
    }

    /// Oldest outstanding hold of exactly the given amount, if any. Used
    /// by the wire adapter to resolve commits that arrive without a hold
    /// reference.
    pub fn oldest_hold_with_amount(&self, amount: Amount) -> Option<HoldId> {
        self.holds
            .values()
            .filter(|h| h.amount == amount)
            .min_by_key(|h| h.created_at)
            .map(|h| h.id)
    }
}
