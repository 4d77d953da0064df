//! Wire DTOs for the transaction endpoint.

use serde::{Deserialize, Serialize};

use fundlock_common::{AccountId, Amount, HoldId, Timestamp};

/// Transaction type discriminator on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireTransactionKind {
    /// Credit the account.
    Deposit,
    /// Ask for a withdrawal authorization (a hold).
    WithdrawRequest,
    /// Commit a previously authorized withdrawal.
    Withdraw,
}

/// Body of `POST /transaction`.
///
/// `hold_id` is an extension over the legacy wire format: authorization
/// responses return one, and commits that carry it consume that exact
/// hold. Commits without it fall back to amount matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// Client-chosen request ID, echoed in logs only.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: WireTransactionKind,
    pub amount: Amount,
    pub account_id: AccountId,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_id: Option<HoldId>,
}

/// Body of a successful `withdraw_request` (HTTP 201).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeResponse {
    pub hold_id: HoldId,
}

/// Body of `GET /account/:account_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub account_id: AccountId,
    pub balance: Amount,
}

/// Error body returned for refused or malformed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}
