use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::{options::Options, version_tag::VersionTag};

/// Converter settings read from a YAML file.
///
/// ```yaml
/// default_target: vnd.evispa.product.code.v2
/// options:
///   uppercase_codes: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Version used when a request does not name one.
    pub default_target: Option<VersionTag>,
    /// Options every conversion starts from.
    pub options: Options,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl ConverterConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_yaml(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_yaml() {
        let config = ConverterConfig::from_yaml(
            r#"
            default_target: vnd.evispa.product.code.v2
            options:
              uppercase_codes: true
              locale: lt
            "#,
        )
        .unwrap();

        assert_eq!(config.default_target, Some(VersionTag::new("vnd.evispa.product.code.v2")));
        assert!(config.options.flag("uppercase_codes"));
        assert_eq!(config.options.get_str("locale"), Some("lt"));
    }

    #[test]
    fn test_config_defaults() {
        assert_eq!(ConverterConfig::from_yaml("").unwrap(), ConverterConfig::default());

        let config = ConverterConfig::from_yaml("options: {}").unwrap();
        assert!(config.default_target.is_none());
        assert!(config.options.is_empty());
    }

    #[test]
    fn test_config_rejects_empty_target() {
        assert!(ConverterConfig::from_yaml("default_target: ''").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let error = ConverterConfig::load("/nonexistent/object-migration.yaml").unwrap_err();
        assert!(matches!(error, ConfigError::Read { .. }));
    }
}
