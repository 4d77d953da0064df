//! Ledger configuration.

use std::time::Duration;

/// Timing configuration for holds and the expiry sweep.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// How long an uncommitted hold stays active before the sweep may
    /// release it. Should sit above the clients' request timeout so a
    /// slow commit is not expired out from under a live caller.
    pub hold_ttl: Duration,
    /// Interval between expiry sweeps.
    pub sweep_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            hold_ttl: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

impl LedgerConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.hold_ttl.is_zero() {
            return Err("Hold TTL cannot be zero".to_string());
        }

        if self.sweep_interval.is_zero() {
            return Err("Sweep interval cannot be zero".to_string());
        }

        if self.sweep_interval > self.hold_ttl {
            return Err("Sweep interval cannot exceed hold TTL".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = LedgerConfig::default();
        config.hold_ttl = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.sweep_interval = config.hold_ttl * 2;
        assert!(config.validate().is_err());
    }
}
