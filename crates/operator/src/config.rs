//! Operator configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// User-supplied site and account settings, loaded from a TOML file.
///
/// Keys use the kebab-case names the configuration surface exposes to
/// operators (`account-mail`, `site-name`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OperatorConfig {
    /// Admin account email address.
    pub account_mail: String,
    /// Admin account name.
    pub account_name: String,
    /// Admin account password. When unset, a password is generated once
    /// at first initialization and kept for the deployment's lifetime.
    pub account_password: Option<String>,
    /// Site display name.
    pub site_name: String,
    /// Site email address.
    pub site_mail: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            account_mail: "admin@example.com".to_string(),
            account_name: "admin".to_string(),
            account_password: None,
            site_name: "Drupal".to_string(),
            site_mail: "site@example.com".to_string(),
        }
    }
}

impl OperatorConfig {
    /// Load configuration from a TOML file. A missing file yields the
    /// defaults; a malformed file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::config_read_failed(path, e.to_string())),
        };
        toml::from_str(&raw).map_err(|e| Error::config_invalid(path, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_defaults() {
        let config = OperatorConfig::default();
        assert_eq!(config.account_name, "admin");
        assert!(config.account_password.is_none());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = OperatorConfig::load(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, OperatorConfig::default());
    }

    #[test]
    fn test_load_kebab_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
account-mail = "ops@example.org"
account-name = "site-admin"
account-password = "hunter2"
site-name = "My Site"
site-mail = "noreply@example.org"
"#,
        )
        .unwrap();

        let config = OperatorConfig::load(&path).unwrap();
        assert_eq!(config.account_mail, "ops@example.org");
        assert_eq!(config.account_name, "site-admin");
        assert_eq!(config.account_password.as_deref(), Some("hunter2"));
        assert_eq!(config.site_name, "My Site");
        assert_eq!(config.site_mail, "noreply@example.org");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "site-name = \"Partial\"\n").unwrap();

        let config = OperatorConfig::load(&path).unwrap();
        assert_eq!(config.site_name, "Partial");
        assert_eq!(config.account_name, "admin");
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "account-mail = [not toml").unwrap();

        assert!(matches!(
            OperatorConfig::load(&path),
            Err(Error::ConfigInvalid { .. })
        ));
    }
}
