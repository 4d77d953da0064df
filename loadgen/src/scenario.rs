//! Load scenarios.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use fundlock_common::{AccountId, Amount, HoldId};

/// What a planned transaction does.
#[derive(Debug, Clone)]
pub enum PlannedKind {
    /// Credit the account.
    Deposit,
    /// Ask for a withdrawal authorization.
    WithdrawRequest,
    /// Commit a previously granted authorization.
    Withdraw { hold_id: HoldId },
}

/// One transaction the driver will issue.
#[derive(Debug, Clone)]
pub struct PlannedTransaction {
    pub kind: PlannedKind,
    pub amount: Amount,
    pub account_id: AccountId,
}

impl PlannedTransaction {
    pub fn deposit(account_id: AccountId, amount: i64) -> Self {
        Self {
            kind: PlannedKind::Deposit,
            amount: Amount::new(amount),
            account_id,
        }
    }

    pub fn withdraw_request(account_id: AccountId, amount: i64) -> Self {
        Self {
            kind: PlannedKind::WithdrawRequest,
            amount: Amount::new(amount),
            account_id,
        }
    }

    pub fn withdraw(account_id: AccountId, amount: Amount, hold_id: HoldId) -> Self {
        Self {
            kind: PlannedKind::Withdraw { hold_id },
            amount,
            account_id,
        }
    }
}

/// A load scenario: a named, pre-planned transaction sequence.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Transactions to issue, in order.
    pub transactions: Vec<PlannedTransaction>,
}

impl Scenario {
    /// Load a scenario by name.
    pub fn load(name: &str, seed: Option<u64>) -> anyhow::Result<Self> {
        match name {
            "deposits-and-withdrawals" => Ok(Self::deposits_and_withdrawals()),
            "authorization-race" => Ok(Self::authorization_race()),
            "mixed" => Ok(Self::mixed(seed)),
            _ => Err(anyhow::anyhow!("Unknown scenario: {}", name)),
        }
    }

    /// 100 alternating $1 withdrawals and deposits on a single account,
    /// seeded with $10,000.00.
    fn deposits_and_withdrawals() -> Self {
        let account = AccountId::new(Uuid::new_v4().to_string());

        let mut transactions: Vec<PlannedTransaction> = [100_000, 200_000, 300_000, 400_000]
            .into_iter()
            .map(|amount| PlannedTransaction::deposit(account.clone(), amount))
            .collect();

        transactions.extend((0..100).map(|i| {
            if i % 2 == 0 {
                PlannedTransaction::withdraw_request(account.clone(), 1)
            } else {
                PlannedTransaction::deposit(account.clone(), 1)
            }
        }));

        Self {
            name: "deposits-and-withdrawals".to_string(),
            description: "100 deposits and withdrawals on a single account".to_string(),
            transactions,
        }
    }

    /// One deposit of 100, then three authorization requests for the
    /// full amount. A correct ledger grants at most one of them; the
    /// final balance must never go negative.
    fn authorization_race() -> Self {
        let account = AccountId::new(Uuid::new_v4().to_string());

        let mut transactions = vec![PlannedTransaction::deposit(account.clone(), 100)];
        transactions.extend(
            (0..3).map(|_| PlannedTransaction::withdraw_request(account.clone(), 100)),
        );

        Self {
            name: "authorization-race".to_string(),
            description: "Concurrent full-balance authorizations on one account".to_string(),
            transactions,
        }
    }

    /// Randomized traffic across several accounts.
    fn mixed(seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let accounts: Vec<AccountId> = (0..5)
            .map(|_| AccountId::new(Uuid::new_v4().to_string()))
            .collect();

        let mut transactions = Vec::with_capacity(250);

        // Seed every account so withdrawals have something to take.
        for account in &accounts {
            transactions.push(PlannedTransaction::deposit(
                account.clone(),
                rng.gen_range(50_000..200_000),
            ));
        }

        for _ in 0..200 {
            let account = accounts[rng.gen_range(0..accounts.len())].clone();
            if rng.gen_bool(0.5) {
                transactions.push(PlannedTransaction::deposit(
                    account,
                    rng.gen_range(1..10_000),
                ));
            } else {
                transactions.push(PlannedTransaction::withdraw_request(
                    account,
                    rng.gen_range(1..5_000),
                ));
            }
        }

        Self {
            name: "mixed".to_string(),
            description: "Randomized multi-account deposits and withdrawals".to_string(),
            transactions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_scenarios_load() {
        for name in ["deposits-and-withdrawals", "authorization-race", "mixed"] {
            assert!(Scenario::load(name, Some(7)).is_ok());
        }
        assert!(Scenario::load("nope", None).is_err());
    }

    #[test]
    fn test_deposits_and_withdrawals_shape() {
        let scenario = Scenario::load("deposits-and-withdrawals", None).unwrap();
        assert_eq!(scenario.transactions.len(), 104);

        let deposited: i64 = scenario
            .transactions
            .iter()
            .filter(|t| matches!(t.kind, PlannedKind::Deposit))
            .map(|t| t.amount.minor_units())
            .sum();
        assert_eq!(deposited, 1_000_000 + 50);
    }

    #[test]
    fn test_mixed_is_reproducible_with_seed() {
        let a = Scenario::load("mixed", Some(42)).unwrap();
        let b = Scenario::load("mixed", Some(42)).unwrap();

        let amounts = |s: &Scenario| -> Vec<i64> {
            s.transactions.iter().map(|t| t.amount.minor_units()).collect()
        };
        assert_eq!(amounts(&a), amounts(&b));
    }
}
