// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Required Manifest
//!
//! Generates a static module listing the required and optional key names found
//! in a dot-file, so application code can import them and hand them to
//! [`EnvironmentOptions`](crate::EnvironmentOptions).
//!
//! The output looks like:
//!
//! ```text
//! module.exports = {
//!   "required": [
//!     "A",
//!     "C"
//!   ],
//!   "optional": [
//!     "B"
//!   ]
//! };
//! ```

use crate::{
    dotenv::{DotEnv, scan_dot_env},
    env_keys::{DEFAULT_ENV_FILE, DEFAULT_REQUIRE_FILE, STDOUT_TARGET},
    errors::DatastoreEnvError,
};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Sorted, deduplicated key lists. Skipped keys appear in neither.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Manifest {
    pub required: Vec<String>,
    pub optional: Vec<String>,
}

impl Manifest {
    /// Builds the manifest for scanned settings.
    pub fn from_settings(settings: &DotEnv) -> Manifest {
        let mut manifest = Manifest::default();
        for (key, setting) in settings {
            if setting.required {
                manifest.required.push(key.clone());
            } else if setting.optional {
                manifest.optional.push(key.clone());
            }
        }
        manifest.required.sort();
        manifest.required.dedup();
        manifest.optional.sort();
        manifest.optional.dedup();
        manifest
    }

    /// Renders the manifest as a module source file.
    pub fn render(&self) -> Result<String, DatastoreEnvError> {
        let body = serde_json::to_string_pretty(self).map_err(|source| DatastoreEnvError::Json {
            path: PathBuf::from(STDOUT_TARGET),
            source,
        })?;
        Ok(format!("module.exports = {body};\n"))
    }
}

/// Where the manifest goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    File(PathBuf),
}

impl From<&str> for Output {
    fn from(value: &str) -> Self {
        if value == STDOUT_TARGET {
            Output::Stdout
        } else {
            Output::File(PathBuf::from(value))
        }
    }
}

/// Options for [`generate_required`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    pub env_file: PathBuf,
    pub output: Output,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            env_file: PathBuf::from(DEFAULT_ENV_FILE),
            output: Output::File(PathBuf::from(DEFAULT_REQUIRE_FILE)),
        }
    }
}

/// Scans `options.env_file` and writes its manifest to `options.output`,
/// overwriting any existing file.
///
/// Narration is logged only when writing to a file.
pub async fn generate_required(options: &GenerateOptions) -> Result<Manifest, DatastoreEnvError> {
    let narrate = options.output != Output::Stdout;

    if narrate {
        info!(
            "Reading environment variable names from {} ...",
            options.env_file.display()
        );
    }

    let settings = scan_dot_env(&options.env_file).await?;
    let manifest = Manifest::from_settings(&settings);
    let rendered = manifest.render()?;

    match &options.output {
        Output::Stdout => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(rendered.as_bytes())
                .await
                .map_err(|e| DatastoreEnvError::io(STDOUT_TARGET, e))?;
            stdout
                .flush()
                .await
                .map_err(|e| DatastoreEnvError::io(STDOUT_TARGET, e))?;
        }
        Output::File(path) => {
            info!(
                required = manifest.required.len(),
                optional = manifest.optional.len(),
                "Writing {} variables to {} ...",
                manifest.required.len() + manifest.optional.len(),
                path.display()
            );
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| DatastoreEnvError::io(parent, e))?;
            }
            tokio::fs::write(path, rendered)
                .await
                .map_err(|e| DatastoreEnvError::io(path, e))?;
            info!("Done");
        }
    }

    Ok(manifest)
}
