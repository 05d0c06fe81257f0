//! Service layer construction and install artifacts.
//!
//! The base layer defines the `drupal` daemon and the `install-drush`
//! bootstrap. The install layer adds the one-shot `install-drupal`
//! service with its environment fully determined by the current
//! configuration and the parsed primary connection; it is only
//! constructible once a connection string is present.

use std::collections::BTreeMap;

use drupal_workload::{ServiceLayer, ServiceSpec, Startup, WorkloadController};

use crate::config::OperatorConfig;
use crate::conninfo::DbConfig;
use crate::error::Result;

/// Name of the long-running workload service.
pub const DRUPAL_SERVICE: &str = "drupal";
/// Name of the Drush bootstrap service.
pub const INSTALL_DRUSH_SERVICE: &str = "install-drush";
/// Name of the one-shot site installation service.
pub const INSTALL_DRUPAL_SERVICE: &str = "install-drupal";

/// Workload path of the Drush installer script.
pub const DRUSH_SCRIPT_PATH: &str = "/charm/bin/install_drush.sh";
/// Workload path of the site installer script.
pub const DRUPAL_SCRIPT_PATH: &str = "/charm/bin/install_drupal.sh";

const DRUSH_SCRIPT: &str = include_str!("../scripts/install_drush.sh");
const DRUPAL_SCRIPT: &str = include_str!("../scripts/install_drupal.sh");

/// Installer scripts are executable by everyone, writable by owner.
const SCRIPT_MODE: u32 = 0o755;

const LAYER_SUMMARY: &str = "drupal layer";
const LAYER_DESCRIPTION: &str = "service layer for drupal";

/// Push the fixed installer scripts into the workload filesystem.
/// Idempotent: content is constant, so re-pushing changes nothing.
pub async fn push_install_artifacts(workload: &dyn WorkloadController) -> Result<()> {
    workload
        .push_file(DRUSH_SCRIPT_PATH, DRUSH_SCRIPT, SCRIPT_MODE)
        .await?;
    workload
        .push_file(DRUPAL_SCRIPT_PATH, DRUPAL_SCRIPT, SCRIPT_MODE)
        .await?;
    Ok(())
}

fn drupal_service(before: &str) -> ServiceSpec {
    ServiceSpec::new(
        "Runs apache2 in the foreground",
        "docker-php-entrypoint apache2-foreground",
    )
    .before(before)
}

fn install_drush_service() -> ServiceSpec {
    ServiceSpec::new("Installs Drush into the workload", DRUSH_SCRIPT_PATH)
        .with_startup(Startup::Enabled)
}

/// Initial layer applied when the workload becomes ready.
pub fn base_layer() -> ServiceLayer {
    ServiceLayer::new(LAYER_SUMMARY, LAYER_DESCRIPTION)
        .with_service(DRUPAL_SERVICE, drupal_service(INSTALL_DRUSH_SERVICE))
        .with_service(INSTALL_DRUSH_SERVICE, install_drush_service())
}

/// Layer applied when installation can begin: the base services plus a
/// populated `install-drupal` entry.
pub fn install_layer(
    config: &OperatorConfig,
    admin_password: &str,
    db: &DbConfig,
) -> ServiceLayer {
    let environment: BTreeMap<String, String> = [
        ("ACCOUNT_MAIL", config.account_mail.as_str()),
        ("ACCOUNT_NAME", config.account_name.as_str()),
        ("ACCOUNT_PASS", admin_password),
        ("SITE_NAME", config.site_name.as_str()),
        ("SITE_MAIL", config.site_mail.as_str()),
        ("DB_USER", db.user.as_str()),
        ("DB_PASS", db.password.as_str()),
        ("DB_HOST", db.host.as_str()),
        ("DB_PORT", db.port.as_str()),
        ("DB_NAME", db.dbname.as_str()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    ServiceLayer::new(LAYER_SUMMARY, LAYER_DESCRIPTION)
        .with_service(DRUPAL_SERVICE, drupal_service(INSTALL_DRUPAL_SERVICE))
        .with_service(INSTALL_DRUSH_SERVICE, install_drush_service())
        .with_service(
            INSTALL_DRUPAL_SERVICE,
            ServiceSpec::new("Installs the Drupal site", DRUPAL_SCRIPT_PATH)
                .with_environment(environment),
        )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn sample_db() -> DbConfig {
        DbConfig {
            user: "drupal".into(),
            password: "pw".into(),
            host: "10.0.0.5".into(),
            port: "5432".into(),
            dbname: "drupal".into(),
        }
    }

    #[test]
    fn test_base_layer_shape() {
        let layer = base_layer();
        assert_eq!(layer.len(), 2);

        let drupal = layer.service(DRUPAL_SERVICE).unwrap();
        assert_eq!(drupal.startup, Startup::Disabled);
        assert_eq!(drupal.before, vec![INSTALL_DRUSH_SERVICE.to_string()]);

        let drush = layer.service(INSTALL_DRUSH_SERVICE).unwrap();
        assert_eq!(drush.startup, Startup::Enabled);
        assert_eq!(drush.command, DRUSH_SCRIPT_PATH);
    }

    #[test]
    fn test_install_layer_environment_keys() {
        let config = OperatorConfig::default();
        let layer = install_layer(&config, "secret", &sample_db());

        let install = layer.service(INSTALL_DRUPAL_SERVICE).unwrap();
        assert_eq!(install.startup, Startup::Disabled);

        let keys: Vec<&str> = install.environment.keys().map(String::as_str).collect();
        let mut expected = vec![
            "ACCOUNT_MAIL",
            "ACCOUNT_NAME",
            "ACCOUNT_PASS",
            "SITE_NAME",
            "SITE_MAIL",
            "DB_USER",
            "DB_PASS",
            "DB_HOST",
            "DB_PORT",
            "DB_NAME",
        ];
        expected.sort_unstable();
        assert_eq!(keys, expected);

        assert_eq!(install.environment["ACCOUNT_PASS"], "secret");
        assert_eq!(install.environment["DB_HOST"], "10.0.0.5");
        assert_eq!(install.environment["DB_NAME"], "drupal");
    }

    #[test]
    fn test_install_layer_reorders_drupal_before_install() {
        let layer = install_layer(&OperatorConfig::default(), "pw", &sample_db());
        let drupal = layer.service(DRUPAL_SERVICE).unwrap();
        assert_eq!(drupal.before, vec![INSTALL_DRUPAL_SERVICE.to_string()]);
    }

    #[tokio::test]
    async fn test_push_install_artifacts() {
        let workload = drupal_workload::InMemoryWorkload::new();
        push_install_artifacts(&workload).await.unwrap();

        let (contents, mode) = workload.file(DRUSH_SCRIPT_PATH).await.unwrap();
        assert!(contents.starts_with("#!/bin/sh"));
        assert_eq!(mode, 0o755);
        assert!(workload.file(DRUPAL_SCRIPT_PATH).await.is_some());
    }
}
