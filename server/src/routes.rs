//! HTTP routes and handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::debug;

use fundlock_common::{AccountId, LedgerError};
use fundlock_ledger::LedgerEngine;

use crate::metrics::ServerMetrics;
use crate::wire::{
    AuthorizeResponse, BalanceResponse, ErrorResponse, TransactionRequest, WireTransactionKind,
};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LedgerEngine>,
    pub metrics: Arc<ServerMetrics>,
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/transaction", post(handle_transaction))
        .route("/account/:account_id", get(handle_get_balance))
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `POST /transaction`: deposit, withdrawal authorization, or commit.
///
/// The body is taken as a raw JSON value; every malformed shape, unknown
/// type included, maps to 400 with an error body.
async fn handle_transaction(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let request: TransactionRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(err) => {
            state.metrics.request_rejected();
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    code: "INVALID_REQUEST".to_string(),
                    message: format!("Invalid transaction: {err}"),
                }),
            )
                .into_response();
        }
    };

    debug!(
        request_id = %request.id,
        kind = ?request.kind,
        account = %request.account_id,
        amount = %request.amount,
        "Transaction received"
    );

    match request.kind {
        WireTransactionKind::Deposit => {
            match state.engine.deposit(&request.account_id, request.amount).await {
                Ok(()) => {
                    state.metrics.deposit_applied();
                    StatusCode::OK.into_response()
                }
                Err(err) => refuse(&state, err),
            }
        }
        WireTransactionKind::WithdrawRequest => {
            match state.engine.authorize(&request.account_id, request.amount).await {
                Ok(hold_id) => {
                    state.metrics.authorization_granted();
                    (StatusCode::CREATED, Json(AuthorizeResponse { hold_id })).into_response()
                }
                Err(err) => refuse(&state, err),
            }
        }
        WireTransactionKind::Withdraw => {
            // Commits carrying a hold reference consume that exact hold;
            // legacy-shaped commits match the oldest hold of the amount.
            let result = match request.hold_id {
                Some(hold_id) => state
                    .engine
                    .commit(&request.account_id, hold_id)
                    .await
                    .map(|_| hold_id),
                None => {
                    state
                        .engine
                        .commit_matching(&request.account_id, request.amount)
                        .await
                }
            };

            match result {
                Ok(_) => {
                    state.metrics.commit_applied();
                    StatusCode::OK.into_response()
                }
                Err(err) => refuse(&state, err),
            }
        }
    }
}

/// `GET /account/:account_id`: committed balance snapshot. Unknown
/// accounts read as zero; this path never takes an account gate.
async fn handle_get_balance(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Response {
    let account_id = AccountId::new(account_id);
    let balance = state.engine.balance(&account_id);
    state.metrics.balance_query();

    (StatusCode::OK, Json(BalanceResponse { account_id, balance })).into_response()
}

/// `GET /health`.
async fn handle_health(State(state): State<AppState>) -> Response {
    if state.engine.accepts_requests() {
        (StatusCode::OK, "ok").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response()
    }
}

/// `GET /metrics`: Prometheus text exposition.
async fn handle_metrics(State(state): State<AppState>) -> Response {
    (StatusCode::OK, state.metrics.to_prometheus()).into_response()
}

/// Map a ledger error to its wire status and record it.
fn refuse(state: &AppState, err: LedgerError) -> Response {
    let status = match err {
        LedgerError::InvalidAmount { .. } => {
            state.metrics.request_rejected();
            StatusCode::BAD_REQUEST
        }
        LedgerError::InsufficientFunds { .. } => {
            state.metrics.authorization_refused();
            StatusCode::PAYMENT_REQUIRED
        }
        LedgerError::UnknownHold(_) => {
            state.metrics.commit_refused();
            StatusCode::CONFLICT
        }
        LedgerError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        status,
        Json(ErrorResponse {
            code: err.error_code().to_string(),
            message: err.to_string(),
        }),
    )
        .into_response()
}
