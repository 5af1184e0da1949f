// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Dot-File Scanner
//!
//! Reads a `.env` style file into a map of key to [`Setting`], classifying each
//! key as required, optional or skipped.
//!
//! ## Format
//!
//! - Blank lines and lines starting with `#` carry no data.
//! - A data line is `KEY=value`; the value is everything after the first `=`.
//!   A line without `=` declares a key with an empty value.
//! - Directive comments classify the data lines after them:
//!   - `# optional` (any case) marks the next key optional.
//!   - `# datastore-env-ignore` skips the next key.
//!   - `# datastore-env-ignore-all` skips every remaining key in the file.
//!
//! Single-key directives stay pending across blank lines and are dropped by
//! any other comment line.

use crate::errors::DatastoreEnvError;
use std::{collections::BTreeMap, path::Path};

const OPTIONAL_DIRECTIVE: &str = "# optional";
const IGNORE_DIRECTIVE: &str = "# datastore-env-ignore";
const IGNORE_ALL_DIRECTIVE: &str = "# datastore-env-ignore-all";

/// Classification of a single key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Setting {
    pub value: String,
    pub optional: bool,
    pub skip: bool,
    pub required: bool,
}

/// Scanned settings, sorted by key.
pub type DotEnv = BTreeMap<String, Setting>;

/// Reads and parses the dot-file at `path`.
pub async fn scan_dot_env(path: impl AsRef<Path>) -> Result<DotEnv, DatastoreEnvError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DatastoreEnvError::io(path, e))?;
    Ok(parse_dot_env(&content))
}

/// Parses dot-file content. A repeated key replaces the earlier one.
pub fn parse_dot_env(content: &str) -> DotEnv {
    let mut settings = DotEnv::new();

    let mut optional_next = false;
    let mut skip_next = false;
    let mut skip_all = false;

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with('#') {
            optional_next = line.to_lowercase().starts_with(OPTIONAL_DIRECTIVE);
            skip_next = line.starts_with(IGNORE_DIRECTIVE) && !line.starts_with(IGNORE_ALL_DIRECTIVE);
            skip_all = skip_all || line.starts_with(IGNORE_ALL_DIRECTIVE);
            continue;
        }

        let (name, value) = line.split_once('=').unwrap_or((line, ""));
        let name = name.trim();
        if name.is_empty() {
            continue;
        }

        let skip = skip_next || skip_all;
        let optional = optional_next && !skip;
        settings.insert(
            name.to_owned(),
            Setting {
                value: value.to_owned(),
                optional,
                skip,
                required: !(optional || skip),
            },
        );

        optional_next = false;
        skip_next = false;
    }

    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn classes(settings: &DotEnv) -> Vec<(&str, bool, bool, bool)> {
        settings
            .iter()
            .map(|(k, s)| (k.as_str(), s.required, s.optional, s.skip))
            .collect()
    }

    #[test]
    fn optional_directive_applies_to_next_key_only() {
        let settings = parse_dot_env("A=1\n# optional\nB=2\nC=3");

        assert_eq!(
            classes(&settings),
            vec![
                ("A", true, false, false),
                ("B", false, true, false),
                ("C", true, false, false),
            ]
        );
    }

    #[test]
    fn optional_directive_is_case_insensitive_and_survives_blank_lines() {
        let settings = parse_dot_env("# OPTIONAL - only in dev\n\nDEV_ONLY=1\n");
        assert!(settings["DEV_ONLY"].optional);
    }

    #[test]
    fn other_comments_drop_pending_directives() {
        let settings = parse_dot_env("# optional\n# a note\nKEY=1\n");
        assert!(settings["KEY"].required);
    }

    #[test]
    fn ignore_skips_one_key_and_ignore_all_the_rest() {
        let settings = parse_dot_env(
            "A=1\n# datastore-env-ignore\nB=2\nC=3\n# datastore-env-ignore-all\nD=4\n# optional\nE=5\n",
        );

        assert_eq!(
            classes(&settings),
            vec![
                ("A", true, false, false),
                ("B", false, false, true),
                ("C", true, false, false),
                ("D", false, false, true),
                ("E", false, false, true),
            ]
        );
    }

    #[test]
    fn value_is_everything_after_first_equals() {
        let settings = parse_dot_env("SERVER_URL=http://test.example/?a=1\nEMPTY=\nBARE\n");

        assert_eq!(settings["SERVER_URL"].value, "http://test.example/?a=1");
        assert_eq!(settings["EMPTY"].value, "");
        assert_eq!(settings["BARE"].value, "");
    }

    #[tokio::test]
    async fn scan_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "API_KEY=a secret\n").unwrap();

        let settings = scan_dot_env(&path).await.unwrap();
        assert_eq!(settings["API_KEY"].value, "a secret");
    }

    #[tokio::test]
    async fn scan_missing_file_is_io_error() {
        let err = scan_dot_env("/definitely/not/here/.env").await.unwrap_err();
        assert!(matches!(err, DatastoreEnvError::Io { .. }));
    }
}
