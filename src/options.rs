// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Environment Options
//!
//! Construction options for [`DatastoreEnvironment`](crate::DatastoreEnvironment).
//!
//! Options follow a fluent interface: start from [`EnvironmentOptions::new`] and
//! chain the setters you need. Every key handed to the options is canonicalized
//! to upper case.
//!
//! ## Example
//!
//! ```rust
//! use datastore_env::EnvironmentOptions;
//!
//! let options = EnvironmentOptions::new()
//!     .required(["database_url", "api_key"])
//!     .optional(["sentry_dsn"])
//!     .default_value("log_level", "info")
//!     .namespace("staging");
//!
//! assert_eq!(options.required, vec!["DATABASE_URL", "API_KEY"]);
//! assert_eq!(options.kind, "Env");
//! ```

use crate::env_keys::{DEFAULT_KIND, PLACEHOLDER};
use std::collections::HashMap;

/// Typed, defaulted construction options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentOptions {
    /// Keys whose absence after the merge is fatal, in declaration order.
    pub required: Vec<String>,
    /// Keys whose absence is tolerated.
    pub optional: Vec<String>,
    /// Lowest precedence values.
    pub defaults: HashMap<String, String>,
    /// Store namespace, `None` for the default namespace.
    pub namespace: Option<String>,
    /// Entity kind holding the entries.
    pub kind: String,
    /// Explicit project id, taking precedence over every environment variable.
    pub project_id: Option<String>,
    /// Sentinel written for missing required keys.
    pub placeholder: String,
    /// Fail construction when the store is not reachable.
    pub datastore_required: bool,
}

impl Default for EnvironmentOptions {
    fn default() -> Self {
        EnvironmentOptions {
            required: Vec::new(),
            optional: Vec::new(),
            defaults: HashMap::new(),
            namespace: None,
            kind: DEFAULT_KIND.to_owned(),
            project_id: None,
            placeholder: PLACEHOLDER.to_owned(),
            datastore_required: false,
        }
    }
}

impl EnvironmentOptions {
    /// Options with every field at its default.
    pub fn new() -> EnvironmentOptions {
        EnvironmentOptions::default()
    }

    /// Appends required keys. Duplicates are dropped.
    pub fn required<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        extend_unique(&mut self.required, keys);
        self
    }

    /// Appends optional keys. Duplicates are dropped.
    pub fn optional<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        extend_unique(&mut self.optional, keys);
        self
    }

    /// Adds one default value.
    pub fn default_value(mut self, key: &str, value: impl Into<String>) -> Self {
        self.defaults.insert(key.to_uppercase(), value.into());
        self
    }

    /// Adds many default values.
    pub fn defaults<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.defaults.extend(
            values
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_uppercase(), v.into())),
        );
        self
    }

    /// Sets the store namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the entity kind, `Env` by default.
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Sets the project id explicitly.
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Sets the sentinel written for missing required keys.
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Makes construction fail when no store signal is present.
    pub fn datastore_required(mut self, required: bool) -> Self {
        self.datastore_required = required;
        self
    }

    /// Required keys followed by optional ones, without repeats.
    pub fn declared(&self) -> Vec<String> {
        let mut keys = self.required.clone();
        extend_unique(&mut keys, &self.optional);
        keys
    }

    /// Upper-cases and deduplicates every key, including those placed
    /// directly in the public fields.
    pub(crate) fn canonicalized(mut self) -> Self {
        let required = std::mem::take(&mut self.required);
        extend_unique(&mut self.required, required);

        let optional = std::mem::take(&mut self.optional);
        extend_unique(&mut self.optional, optional);

        self.defaults = std::mem::take(&mut self.defaults)
            .into_iter()
            .map(|(k, v)| (k.to_uppercase(), v))
            .collect();
        self
    }
}

fn extend_unique<I, S>(target: &mut Vec<String>, keys: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for key in keys {
        let key = key.as_ref().to_uppercase();
        if !target.contains(&key) {
            target.push(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = EnvironmentOptions::new();

        assert!(options.required.is_empty());
        assert!(options.optional.is_empty());
        assert!(options.defaults.is_empty());
        assert_eq!(options.kind, "Env");
        assert_eq!(options.placeholder, "** __ SET THIS __ **");
        assert!(!options.datastore_required);
    }

    #[test]
    fn keys_are_canonicalized_and_deduplicated() {
        let options = EnvironmentOptions::new()
            .required(["a", "A", "b"])
            .optional(["b", "c"])
            .defaults([("d", "1")]);

        assert_eq!(options.required, vec!["A", "B"]);
        assert_eq!(options.optional, vec!["B", "C"]);
        assert_eq!(options.declared(), vec!["A", "B", "C"]);
        assert_eq!(options.defaults.get("D").map(String::as_str), Some("1"));
    }

    #[test]
    fn struct_literal_keys_are_canonicalized() {
        let options = EnvironmentOptions {
            required: vec!["db_url".into(), "DB_URL".into()],
            optional: vec!["sentry_dsn".into()],
            defaults: HashMap::from([("log_level".to_string(), "info".to_string())]),
            ..Default::default()
        }
        .canonicalized();

        assert_eq!(options.required, vec!["DB_URL"]);
        assert_eq!(options.optional, vec!["SENTRY_DSN"]);
        assert_eq!(options.defaults.get("LOG_LEVEL").map(String::as_str), Some("info"));
    }
}
