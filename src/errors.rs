// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Errors
//!
//! Error types for the datastore_env crate.
//!
//! This module defines the error types that can occur while resolving the
//! environment, talking to the remote key/value store, or running the dot-file
//! utilities. Every fatal condition rejects the in-flight operation with one of
//! these values; nothing is logged and swallowed on the way out.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a [`KeyValueStore`](crate::store::KeyValueStore) implementation.
///
/// These are transport-level failures. The resolver propagates them unchanged
/// and never retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An insert collided with an entry that already exists.
    ///
    /// # Arguments
    ///
    /// * `0` - The name of the key that already exists
    #[error("entity `{0}` already exists")]
    AlreadyExists(String),

    /// The request could not be sent or no response was received.
    #[error("datastore request failed - `{0}`")]
    Request(String),

    /// The store answered with a non-success status.
    #[error("datastore responded with status {status}: {body}")]
    Response { status: u16, body: String },

    /// The store answered with a body that could not be understood.
    #[error("failed to decode datastore response - `{0}`")]
    Decode(String),
}

/// Where an operator should go to fix a missing-keys failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingKeysHint {
    /// The store was consulted and placeholders were provisioned; the URL
    /// points at the store's entity browser.
    Console { url: String },

    /// No store was available, only the environment and defaults were checked.
    EnvironmentOnly,
}

/// Errors that can occur while resolving or managing the environment.
#[derive(Error, Debug)]
pub enum DatastoreEnvError {
    /// The caller asked for something that cannot succeed, such as verifying
    /// an environment with no declared keys.
    #[error("{0}")]
    Usage(String),

    /// The resolver could not be constructed.
    ///
    /// Raised at construction time when no project identifier can be found or
    /// when the store is required but unreachable.
    #[error("{0}")]
    Configuration(String),

    /// One or more required keys could not be resolved from any tier.
    ///
    /// Always raised after a best-effort attempt to provision placeholders for
    /// the missing keys.
    #[error("{}", missing_keys_message(.keys, .hint))]
    MissingKeys {
        count: usize,
        keys: Vec<String>,
        hint: MissingKeysHint,
    },

    /// A remote store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A file could not be read or written.
    #[error("failed to access `{}` - {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document (credential file or manifest) could not be handled.
    #[error("invalid json in `{}` - {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DatastoreEnvError {
    /// Builds a [`DatastoreEnvError::MissingKeys`] for the given keys.
    pub fn missing_keys(keys: Vec<String>, hint: MissingKeysHint) -> Self {
        DatastoreEnvError::MissingKeys {
            count: keys.len(),
            keys,
            hint,
        }
    }

    /// Names of the missing keys, when this is a missing-keys error.
    pub fn missing(&self) -> Option<&[String]> {
        match self {
            DatastoreEnvError::MissingKeys { keys, .. } => Some(keys),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatastoreEnvError::Io {
            path: path.into(),
            source,
        }
    }
}

fn missing_keys_message(keys: &[String], hint: &MissingKeysHint) -> String {
    let count = keys.len();
    let keys = keys.join(",");
    match hint {
        MissingKeysHint::Console { url } => format!(
            "{count} configuration keys are missing from your\n\
             datastore or environment: {keys}\n\
             Placeholders have been added to your datastore so you can edit them.\n\
             You can edit them at {url}"
        ),
        MissingKeysHint::EnvironmentOnly => format!(
            "{count} configuration keys are missing from your environment: {keys}\n\
             No datastore was consulted; only environment variables and defaults were checked."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_message_lists_keys_and_url() {
        let err = DatastoreEnvError::missing_keys(
            vec!["A".into(), "B".into()],
            MissingKeysHint::Console {
                url: "https://example.test/q".into(),
            },
        );

        assert_eq!(
            err.to_string(),
            "2 configuration keys are missing from your\n\
             datastore or environment: A,B\n\
             Placeholders have been added to your datastore so you can edit them.\n\
             You can edit them at https://example.test/q"
        );
        assert_eq!(err.missing(), Some(&["A".to_string(), "B".to_string()][..]));
    }

    #[test]
    fn environment_only_message_mentions_no_datastore() {
        let err = DatastoreEnvError::missing_keys(vec!["K".into()], MissingKeysHint::EnvironmentOnly);

        let text = err.to_string();
        assert!(text.starts_with("1 configuration keys are missing from your environment: K"));
        assert!(text.contains("No datastore was consulted"));
    }

    #[test]
    fn store_errors_are_transparent() {
        let err: DatastoreEnvError = StoreError::AlreadyExists("KEY".into()).into();
        assert_eq!(err.to_string(), "entity `KEY` already exists");
        assert!(err.missing().is_none());
    }
}
