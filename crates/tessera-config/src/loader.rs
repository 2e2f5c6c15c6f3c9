//! Loading and validating `LedgerConfig` from TOML.

use std::path::Path;

use tracing::debug;

use tessera_contracts::error::{LedgerError, LedgerResult};

use crate::config::LedgerConfig;

impl LedgerConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `LedgerError::Config` if the TOML is malformed, does not match
    /// the `LedgerConfig` schema, or holds values the ledger cannot run with.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        let config: LedgerConfig = toml::from_str(s).map_err(|e| LedgerError::Config {
            reason: format!("failed to parse ledger config TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as ledger configuration.
    pub fn from_file(path: &Path) -> LedgerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LedgerError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        debug!(path = %path.display(), "loading ledger config");
        Self::from_toml_str(&contents)
    }

    /// Reject values that would stall or disable the ledger.
    pub fn validate(&self) -> LedgerResult<()> {
        let fail = |reason: &str| {
            Err(LedgerError::Config {
                reason: reason.to_string(),
            })
        };

        if self.sequencer.lease_timeout_ms == 0 {
            return fail("sequencer.lease_timeout_ms must be greater than zero");
        }
        if self.sequencer.acquire_timeout_ms == 0 {
            return fail("sequencer.acquire_timeout_ms must be greater than zero");
        }
        if self.retry.max_attempts == 0 {
            return fail("retry.max_attempts must be at least 1");
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return fail("retry.initial_backoff_ms must not exceed retry.max_backoff_ms");
        }
        if self.query.default_limit == 0 || self.query.max_limit == 0 {
            return fail("query limits must be greater than zero");
        }
        if self.query.default_limit > self.query.max_limit {
            return fail("query.default_limit must not exceed query.max_limit");
        }
        Ok(())
    }
}
