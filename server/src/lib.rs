//! Fundlock HTTP Server
//!
//! Thin HTTP adapter over the ledger engine: wire DTOs, status-code
//! mapping, and request metrics. The ledger semantics live entirely in
//! `fundlock-ledger`; this crate only translates.

pub mod config;
pub mod metrics;
pub mod routes;
pub mod wire;

pub use config::ServerConfig;
pub use metrics::ServerMetrics;
pub use routes::{router, AppState};
