//! Fundlock Ledger Engine
//!
//! Authorization-safe in-memory funds ledger. Deposits, two-phase
//! withdrawals (authorize then commit), and an expiry sweep, all
//! serialized per account so that no combination of committed debits and
//! active holds can overdraw a balance.

pub mod account;
pub mod config;
pub mod engine;
pub mod gate;
pub mod journal;

pub use account::{AccountState, Hold};
pub use config::LedgerConfig;
pub use engine::{EngineState, LedgerEngine};
pub use gate::AccountGates;
pub use journal::{Journal, TransactionKind, TransactionRecord};
