//! Property test: the solvency invariant survives arbitrary operation
//! sequences.

use std::time::Duration;

use proptest::prelude::*;

use fundlock_common::Amount;
use fundlock_ledger::AccountState;

#[derive(Debug, Clone)]
enum Op {
    Deposit(i64),
    Authorize(i64),
    /// Commit one of the currently outstanding holds, picked by index.
    Commit(usize),
    /// Release one of the currently outstanding holds, picked by index.
    Release(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..=1_000).prop_map(Op::Deposit),
        (1i64..=1_000).prop_map(Op::Authorize),
        (0usize..16).prop_map(Op::Commit),
        (0usize..16).prop_map(Op::Release),
    ]
}

proptest! {
    #[test]
    fn solvency_holds_for_all_operation_sequences(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let ttl = Duration::from_secs(60);
        let mut account = AccountState::new();
        let mut live_holds = Vec::new();

        for op in ops {
            match op {
                Op::Deposit(amount) => account.deposit(Amount::new(amount)),
                Op::Authorize(amount) => {
                    if let Ok(hold_id) = account.authorize(Amount::new(amount), ttl) {
                        live_holds.push(hold_id);
                    }
                }
                Op::Commit(pick) => {
                    if !live_holds.is_empty() {
                        let hold_id = live_holds.remove(pick % live_holds.len());
                        account.commit(hold_id).unwrap();
                    }
                }
                Op::Release(pick) => {
                    if !live_holds.is_empty() {
                        let hold_id = live_holds.remove(pick % live_holds.len());
                        account.release(hold_id).unwrap();
                    }
                }
            }

            // The central invariant, checked after every step.
            prop_assert!(!account.available_to_authorize().is_negative());
            prop_assert!(!account.balance().is_negative());
        }
    }
}
