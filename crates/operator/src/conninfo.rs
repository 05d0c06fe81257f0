//! libpq keyword/value connection string parsing.
//!
//! The database relation delivers the primary connection as a
//! whitespace-separated sequence of `key=value` tokens, e.g.
//!
//! ```text
//! dbname=drupal fallback_application_name=drupal host=10.152.183.143
//! password=XdngqkW... port=5432 user=drupal
//! ```
//!
//! Installation needs `user`, `password`, `host`, `port` and `dbname`.
//! Unknown keys are ignored. A missing or empty required key fails the
//! parse; the engine turns that into a Blocked status instead of
//! proceeding with installation.

use std::collections::BTreeMap;

use thiserror::Error;

/// Connection string parse failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A token without a `=` separator.
    #[error("malformed token '{token}': expected key=value")]
    MalformedToken { token: String },

    /// A required key was absent.
    #[error("missing required key '{key}'")]
    MissingKey { key: &'static str },

    /// A required key was present with an empty value.
    #[error("required key '{key}' has an empty value")]
    EmptyValue { key: &'static str },
}

/// Discrete connection parameters for the install service environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: String,
    pub dbname: String,
}

/// Parse a libpq keyword/value connection string.
pub fn parse(conn_str: &str) -> Result<DbConfig, ParseError> {
    let mut fields: BTreeMap<&str, &str> = BTreeMap::new();
    for token in conn_str.split_whitespace() {
        let (key, value) = token.split_once('=').ok_or_else(|| {
            ParseError::MalformedToken {
                token: token.to_string(),
            }
        })?;
        fields.insert(key, value);
    }

    let required = |key: &'static str| match fields.get(key) {
        None => Err(ParseError::MissingKey { key }),
        Some(&"") => Err(ParseError::EmptyValue { key }),
        Some(&value) => Ok(value.to_string()),
    };

    // Checked in the order the install environment lists them.
    Ok(DbConfig {
        user: required("user")?,
        password: required("password")?,
        host: required("host")?,
        port: required("port")?,
        dbname: required("dbname")?,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const FULL: &str =
        "dbname=drupal fallback_application_name=drupal host=10.152.183.143 \
         password=XdngqkWJSNMX5brHPsjB3MB9wZd4FzBw4xLBXc8s port=5432 user=drupal";

    #[test]
    fn test_parse_full_connection_string() {
        let db = parse(FULL).unwrap();
        assert_eq!(db.user, "drupal");
        assert_eq!(db.password, "XdngqkWJSNMX5brHPsjB3MB9wZd4FzBw4xLBXc8s");
        assert_eq!(db.host, "10.152.183.143");
        assert_eq!(db.port, "5432");
        assert_eq!(db.dbname, "drupal");
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let db = parse(
            "user=u password=p host=h port=5432 dbname=d sslmode=require extra=1",
        )
        .unwrap();
        assert_eq!(db.dbname, "d");
    }

    #[test]
    fn test_missing_required_key() {
        let err = parse("dbname=drupal host=10.0.0.5 port=5432").unwrap_err();
        assert_eq!(err, ParseError::MissingKey { key: "user" });
    }

    #[test]
    fn test_empty_required_value() {
        let err = parse("user=u password=p host= port=5432 dbname=d").unwrap_err();
        assert_eq!(err, ParseError::EmptyValue { key: "host" });
    }

    #[test]
    fn test_malformed_token() {
        let err = parse("user=u password garbage").unwrap_err();
        assert_eq!(
            err,
            ParseError::MalformedToken {
                token: "password".to_string()
            }
        );
    }

    #[test]
    fn test_empty_string_misses_everything() {
        assert_eq!(parse("").unwrap_err(), ParseError::MissingKey { key: "user" });
    }

    #[test]
    fn test_missing_keys_reported_in_required_order() {
        // Both user and port are absent; user is reported first.
        let err = parse("password=p host=h dbname=d").unwrap_err();
        assert_eq!(err, ParseError::MissingKey { key: "user" });
    }

    #[test]
    fn test_last_duplicate_wins() {
        let db = parse("user=a user=b password=p host=h port=1 dbname=d").unwrap();
        assert_eq!(db.user, "b");
    }
}
