//! Configuration objects for the apply path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The flush threshold cannot be zero.
    #[error("`max_rows_before_flush` cannot be zero")]
    MaxRowsBeforeFlushZero,
}

/// Bulk-apply configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ApplyConfig {
    /// Number of rows buffered on the streaming channel before a flush is
    /// forced.
    #[serde(default = "default_max_rows_before_flush")]
    pub max_rows_before_flush: usize,
}

impl ApplyConfig {
    /// Default number of rows buffered before a forced flush.
    pub const DEFAULT_MAX_ROWS_BEFORE_FLUSH: usize = 10_000;

    /// Validates apply configuration settings.
    ///
    /// Ensures the flush threshold is non-zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_rows_before_flush == 0 {
            return Err(ValidationError::MaxRowsBeforeFlushZero);
        }

        Ok(())
    }
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            max_rows_before_flush: default_max_rows_before_flush(),
        }
    }
}

fn default_max_rows_before_flush() -> usize {
    ApplyConfig::DEFAULT_MAX_ROWS_BEFORE_FLUSH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_valid() {
        let config = ApplyConfig::default();
        assert_eq!(
            config.max_rows_before_flush,
            ApplyConfig::DEFAULT_MAX_ROWS_BEFORE_FLUSH
        );
        config.validate().unwrap();
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let config = ApplyConfig {
            max_rows_before_flush: 0,
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MaxRowsBeforeFlushZero)
        ));
    }
}
