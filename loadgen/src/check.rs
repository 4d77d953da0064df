//! Balance verification against a persisted expected-balance file.

use std::collections::HashMap;

use tracing::{error, info};

use fundlock_server::wire::BalanceResponse;

/// Read a `{accountId: expectedBalance}` file written by a previous run
/// and compare each account against the server. Reports every mismatch
/// and every negative balance; any of either fails the check.
pub async fn run_check(file: &str, base_url: &str) -> anyhow::Result<()> {
    let contents = tokio::fs::read_to_string(file).await?;
    let expected: HashMap<String, i64> = serde_json::from_str(&contents)?;
    let client = reqwest::Client::new();

    let mut failures = 0usize;
    for (account_id, expected_balance) in &expected {
        let response = client
            .get(format!("{base_url}/account/{account_id}"))
            .send()
            .await?;
        let body: BalanceResponse = response.json().await?;
        let actual = body.balance.minor_units();

        if actual < 0 {
            error!(
                account = %account_id,
                balance = actual,
                "Balance is less than 0"
            );
            failures += 1;
        } else if actual != *expected_balance {
            error!(
                account = %account_id,
                expected = *expected_balance,
                actual,
                "Balances do not match"
            );
            failures += 1;
        } else {
            info!(account = %account_id, balance = actual, "Balance matches");
        }
    }

    if failures > 0 {
        return Err(anyhow::anyhow!("{failures} account(s) failed verification"));
    }

    info!(accounts = expected.len(), "All balances verified");
    Ok(())
}
