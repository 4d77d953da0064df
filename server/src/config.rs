//! Server configuration.

use std::time::Duration;

use fundlock_ledger::LedgerConfig;

/// Main server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub port: u16,
    /// Hold time-to-live.
    pub hold_ttl: Duration,
    /// Expiry sweep interval.
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            port: 3000,
            hold_ttl: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("FUNDLOCK_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }

        if let Ok(ttl) = std::env::var("FUNDLOCK_HOLD_TTL_MS") {
            if let Ok(ttl) = ttl.parse() {
                config.hold_ttl = Duration::from_millis(ttl);
            }
        }

        if let Ok(interval) = std::env::var("FUNDLOCK_SWEEP_INTERVAL_MS") {
            if let Ok(interval) = interval.parse() {
                config.sweep_interval = Duration::from_millis(interval);
            }
        }

        config
    }

    /// Ledger timing configuration derived from this server config.
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            hold_ttl: self.hold_ttl,
            sweep_interval: self.sweep_interval,
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Listen port cannot be 0".to_string());
        }

        self.ledger_config().validate()
    }
}
