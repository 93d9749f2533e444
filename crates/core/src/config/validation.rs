//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, DocumentConfig};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_connections` or `reader_connections` is outside 1..=64
    /// - `recent_lookups` is 0
    /// - `user_agent` is empty
    /// - any document fails [`DocumentConfig::validate`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if !(1..=64).contains(&self.max_connections) {
            return Err(ConfigError::Invalid {
                field: "max_connections".into(),
                reason: "must be between 1 and 64".into(),
            });
        }
        if !(1..=64).contains(&self.reader_connections) {
            return Err(ConfigError::Invalid {
                field: "reader_connections".into(),
                reason: "must be between 1 and 64".into(),
            });
        }
        if self.recent_lookups == 0 {
            return Err(ConfigError::Invalid {
                field: "recent_lookups".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        for doc in &self.documents {
            doc.validate()?;
        }

        Ok(())
    }
}

impl DocumentConfig {
    /// Validate a single document entry.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` for an empty name and
    /// `ConfigError::Invalid` for an origin prefix that is not an absolute
    /// http(s) URL ending with `/`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Missing {
                field: "documents.name".into(),
                hint: "every document needs a name".into(),
            });
        }

        if let Some(prefix) = &self.url {
            let field = format!("documents.{}.url", self.name);
            let parsed = url::Url::parse(prefix)
                .map_err(|e| ConfigError::Invalid { field: field.clone(), reason: e.to_string() })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid { field, reason: format!("unsupported scheme: {}", parsed.scheme()) });
            }
            if !prefix.ends_with('/') {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("invalid prefix {prefix}: must end with '/'"),
                });
            }
        }

        if !self.whitelist.is_empty() && self.url.is_none() {
            tracing::debug!(document = %self.name, "whitelist set on a local document");
        }

        Ok(())
    }
}
