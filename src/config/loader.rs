//! Configuration file loading.
//!
//! ## Responsibility
//! Read a TOML file from disk, parse it into an [`ExporterConfig`], and run
//! validation before returning. This is the entry point the binary uses at
//! startup.
//!
//! ## Guarantees
//! - A successfully loaded config is always validated
//! - I/O errors and parse errors are distinguished in the error type
//! - File path is included in every error message
//!
//! ## NOT Responsible For
//! - Defining the config schema (that belongs to `mod.rs`)

use std::path::Path;

use super::validation::{self, ConfigError};
use super::ExporterConfig;
use crate::catalog::Topology;

/// Load an [`ExporterConfig`] from a TOML file.
///
/// # Returns
///
/// - `Ok(ExporterConfig)` if the file is readable, well-formed, and valid.
/// - `Err(ConfigError::Io)` if the file cannot be read.
/// - `Err(ConfigError::Parse)` if the TOML is malformed or names an unknown
///   instance type.
/// - `Err(ConfigError::Validation)` if semantic constraints are violated.
///
/// # Example
///
/// ```rust,ignore
/// use memgraph_exporter::config::loader::load_from_file;
/// use std::path::Path;
///
/// let config = load_from_file(Path::new("config.toml"))?;
/// println!("Polling {} instances", config.instances.len());
/// ```
pub fn load_from_file(path: &Path) -> Result<ExporterConfig, ConfigError> {
    load_with_deployment(path, None)
}

/// Load an [`ExporterConfig`] from a TOML file, replacing
/// `exporter.deployment` with `deployment` when one is given.
///
/// The override is applied before validation, so topology-dependent rules
/// see the effective deployment.
pub fn load_with_deployment(
    path: &Path,
    deployment: Option<Topology>,
) -> Result<ExporterConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        file: path.display().to_string(),
        source: e,
    })?;

    parse_and_validate(&content, &path.display().to_string(), deployment)
}

/// Load an [`ExporterConfig`] from a TOML string.
///
/// `source_name` identifies the input in error messages.
pub fn load_from_str(content: &str, source_name: &str) -> Result<ExporterConfig, ConfigError> {
    parse_and_validate(content, source_name, None)
}

fn parse_and_validate(
    content: &str,
    source_name: &str,
    deployment: Option<Topology>,
) -> Result<ExporterConfig, ConfigError> {
    let mut config: ExporterConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
        file: source_name.to_string(),
        source: e,
    })?;
    if let Some(deployment) = deployment {
        config.exporter.deployment = deployment;
    }

    validation::validate(&config).map_err(|errors| {
        ConfigError::Validation(
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
        )
    })?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceRole;
    use std::io::Write;

    const STANDALONE_TOML: &str = r#"
[exporter]
port = 9115
pull_frequency_seconds = 5

[[instances]]
name = "memgraph"
url = "http://localhost"
port = 9091
"#;

    const HA_TOML: &str = r#"
[exporter]
deployment = "HA"

[[instances]]
name = "data_1"
url = "http://localhost"
port = 9091
type = "data_instance"

[[instances]]
name = "coord_1"
url = "http://localhost"
port = 9094
type = "coordinator"
"#;

    #[test]
    fn test_load_from_str_standalone_succeeds() {
        let config = load_from_str(STANDALONE_TOML, "test").expect("test: valid config");
        assert_eq!(config.exporter.deployment, Topology::Standalone);
        assert_eq!(config.instances.len(), 1);
    }

    #[test]
    fn test_load_from_str_ha_succeeds() {
        let config = load_from_str(HA_TOML, "test").expect("test: valid config");
        assert_eq!(config.exporter.deployment, Topology::HighAvailability);
        assert_eq!(config.instances()[1].role(), InstanceRole::Coordinator);
    }

    #[test]
    fn test_load_from_str_invalid_toml_returns_parse_error() {
        let result = load_from_str("not valid toml [[[", "bad.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_from_str_unknown_role_returns_parse_error() {
        let toml_str = r#"
[exporter]
deployment = "HA"

[[instances]]
name = "odd"
url = "http://localhost"
port = 9091
type = "replica-set"
"#;
        let result = load_from_str(toml_str, "unknown-role.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_from_str_ha_without_type_returns_validation_error() {
        let toml_str = r#"
[exporter]
deployment = "HA"

[[instances]]
name = "data_1"
url = "http://localhost"
port = 9091
"#;
        let result = load_from_str(toml_str, "no-type.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_from_str_source_name_appears_in_error() {
        let err = load_from_str("invalid [[[", "my-source.toml").unwrap_err();
        assert!(err.to_string().contains("my-source.toml"));
    }

    #[test]
    fn test_load_from_str_missing_port_returns_parse_error() {
        let toml_str = r#"
[[instances]]
name = "memgraph"
url = "http://localhost"
"#;
        let result = load_from_str(toml_str, "missing-port.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_from_file_valid_toml_succeeds() {
        let dir = tempfile::tempdir().expect("test: create tempdir");
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).expect("test: create file");
        f.write_all(HA_TOML.as_bytes()).expect("test: write");
        drop(f);

        let config = load_from_file(&path).expect("test: load from file");
        assert_eq!(config.instances.len(), 2);
    }

    #[test]
    fn test_load_with_deployment_overrides_before_validation() {
        let dir = tempfile::tempdir().expect("test: create tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, HA_TOML).expect("test: write");

        // Two instances are invalid for a standalone deployment.
        let result = load_with_deployment(&path, Some(Topology::Standalone));
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));

        let config =
            load_with_deployment(&path, Some(Topology::HighAvailability)).expect("test: load");
        assert_eq!(config.exporter.deployment, Topology::HighAvailability);
    }

    #[test]
    fn test_load_from_file_missing_file_returns_io_error() {
        let result = load_from_file(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_from_file_invalid_values_returns_validation_error() {
        let dir = tempfile::tempdir().expect("test: create tempdir");
        let path = dir.path().join("invalid.toml");
        std::fs::write(
            &path,
            "[exporter]\npull_frequency_seconds = 0\n\n[[instances]]\nname = \"m\"\nurl = \"http://localhost\"\nport = 9091\n",
        )
        .expect("test: write");

        let result = load_from_file(&path);
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }
}
