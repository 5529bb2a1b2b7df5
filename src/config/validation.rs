//! Configuration validation engine.
//!
//! ## Responsibility
//! Validate semantic constraints on a parsed [`ExporterConfig`] that cannot
//! be expressed through the type system alone (e.g., range checks, unique
//! instance names, topology-dependent requirements).
//!
//! ## Guarantees
//! - Every validation rule has at least one test that triggers it
//! - Validation collects *all* errors before returning (no short-circuit)
//! - Error messages include the field path and the invalid value
//!
//! ## NOT Responsible For
//! - Parsing TOML (that belongs to `loader`)
//! - File I/O (that belongs to `loader`)

use std::collections::HashSet;

use super::ExporterConfig;
use crate::catalog::Topology;

/// Errors arising from configuration parsing, validation, or I/O.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parsing failed, including unknown instance roles.
    #[error("Parse error in {file}: {source}")]
    Parse {
        /// Path of the file that failed to parse.
        file: String,
        /// Underlying TOML deserialization error.
        #[source]
        source: toml::de::Error,
    },

    /// One or more semantic validation rules failed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A specific field has an out-of-range or contradictory value.
    #[error("Field '{field}' has invalid value {value}: {reason}")]
    InvalidField {
        /// Dot-separated field path (e.g., "instances[0].port").
        field: String,
        /// String representation of the invalid value.
        value: String,
        /// Human-readable explanation of the constraint.
        reason: String,
    },

    /// File I/O error.
    #[error("IO error reading {file}: {source}")]
    Io {
        /// Path of the file that could not be read.
        file: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Validate all semantic constraints on an [`ExporterConfig`].
///
/// # Errors
///
/// Returns every violation found, never just the first.
pub fn validate(config: &ExporterConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // ── Exporter section ─────────────────────────────────────────────
    if config.exporter.port == 0 {
        errors.push(ConfigError::InvalidField {
            field: "exporter.port".into(),
            value: "0".into(),
            reason: "listen port must be at least 1".into(),
        });
    }

    if config.exporter.pull_frequency_seconds == 0 {
        errors.push(ConfigError::InvalidField {
            field: "exporter.pull_frequency_seconds".into(),
            value: "0".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    if config.exporter.request_timeout_ms == 0 {
        errors.push(ConfigError::InvalidField {
            field: "exporter.request_timeout_ms".into(),
            value: "0".into(),
            reason: "must be at least 1ms".into(),
        });
    }

    // ── Instance count per topology ──────────────────────────────────
    match config.exporter.deployment {
        Topology::Standalone if config.instances.len() != 1 => {
            errors.push(ConfigError::InvalidField {
                field: "instances".into(),
                value: config.instances.len().to_string(),
                reason: "a standalone deployment polls exactly one instance".into(),
            });
        }
        Topology::HighAvailability if config.instances.is_empty() => {
            errors.push(ConfigError::InvalidField {
                field: "instances".into(),
                value: "0".into(),
                reason: "an HA deployment needs at least one instance".into(),
            });
        }
        _ => {}
    }

    // ── Per-instance fields ──────────────────────────────────────────
    let mut seen = HashSet::new();
    for (idx, instance) in config.instances.iter().enumerate() {
        if instance.name.trim().is_empty() {
            errors.push(ConfigError::InvalidField {
                field: format!("instances[{idx}].name"),
                value: String::new(),
                reason: "instance name must not be empty".into(),
            });
        } else if !seen.insert(instance.name.as_str()) {
            errors.push(ConfigError::InvalidField {
                field: format!("instances[{idx}].name"),
                value: instance.name.clone(),
                reason: "instance names must be unique".into(),
            });
        }

        if !(instance.url.starts_with("http://") || instance.url.starts_with("https://")) {
            errors.push(ConfigError::InvalidField {
                field: format!("instances[{idx}].url"),
                value: instance.url.clone(),
                reason: "url must start with http:// or https://".into(),
            });
        }

        if instance.port == 0 {
            errors.push(ConfigError::InvalidField {
                field: format!("instances[{idx}].port"),
                value: "0".into(),
                reason: "port must be at least 1".into(),
            });
        }

        if config.exporter.deployment == Topology::HighAvailability && instance.role.is_none() {
            errors.push(ConfigError::InvalidField {
                field: format!("instances[{idx}].type"),
                value: String::new(),
                reason: "type is required in HA deployments (data_instance or coordinator)"
                    .into(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
