//! Append-only audit journal.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use fundlock_common::{now, AccountId, Amount, Timestamp, TransactionId};

/// Kind of state change recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Balance credited.
    Deposit,
    /// Hold created by a withdrawal authorization.
    Authorize,
    /// Hold consumed; balance debited.
    Commit,
    /// Hold discarded (explicitly or by expiry); balance untouched.
    Release,
}

/// An immutable audit record written after each successful state change.
///
/// The journal exists for observability and testing only. Balances are
/// never recomputed from it; the authoritative balance lives in the
/// account state behind the gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique record ID.
    pub id: TransactionId,
    /// Account affected.
    pub account_id: AccountId,
    /// What happened.
    pub kind: TransactionKind,
    /// Amount involved.
    pub amount: Amount,
    /// When the record was written.
    pub recorded_at: Timestamp,
}

impl TransactionRecord {
    /// Create a record stamped with the current time.
    pub fn new(account_id: AccountId, kind: TransactionKind, amount: Amount) -> Self {
        Self {
            id: TransactionId::new(),
            account_id,
            kind,
            amount,
            recorded_at: now(),
        }
    }
}

/// Append-only journal of transaction records.
pub struct Journal {
    entries: Mutex<Vec<TransactionRecord>>,
}

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Append a record.
    pub fn record(&self, record: TransactionRecord) {
        self.entries.lock().push(record);
    }

    /// Number of records written so far.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// All records for one account, in append order.
    pub fn entries_for_account(&self, account_id: &AccountId) -> Vec<TransactionRecord> {
        self.entries
            .lock()
            .iter()
            .filter(|r| &r.account_id == account_id)
            .cloned()
            .collect()
    }

    /// Snapshot of the full journal.
    pub fn snapshot(&self) -> Vec<TransactionRecord> {
        self.entries.lock().clone()
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_append_in_order() {
        let journal = Journal::new();
        let account = AccountId::new("acct-1");

        journal.record(TransactionRecord::new(
            account.clone(),
            TransactionKind::Deposit,
            Amount::new(100),
        ));
        journal.record(TransactionRecord::new(
            account.clone(),
            TransactionKind::Authorize,
            Amount::new(40),
        ));
        journal.record(TransactionRecord::new(
            AccountId::new("acct-2"),
            TransactionKind::Deposit,
            Amount::new(7),
        ));

        assert_eq!(journal.len(), 3);

        let entries = journal.entries_for_account(&account);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, TransactionKind::Deposit);
        assert_eq!(entries[1].kind, TransactionKind::Authorize);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TransactionKind::Authorize).unwrap();
        assert_eq!(json, "\"authorize\"");
    }
}
