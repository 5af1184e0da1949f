// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Dot-File Upload
//!
//! Copies the values of a dot-file into the remote store.
//!
//! Without `overwrite`, keys that already exist remotely are read first and
//! left untouched, and the remaining ones are inserted. With `overwrite`,
//! every selected key is saved.

use crate::{
    dotenv::scan_dot_env,
    env_keys::DEFAULT_ENV_FILE,
    errors::DatastoreEnvError,
    options::EnvironmentOptions,
    resolver::DatastoreEnvironment,
    store::{Entity, KeyValueStore},
};
use std::{collections::HashSet, fmt, path::PathBuf, str::FromStr, sync::Arc};
use tracing::info;

/// Which keys of the dot-file to upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Include {
    /// Every key, skipped ones included.
    All,
    /// Required and optional keys.
    #[default]
    Optional,
    /// Required keys only.
    Required,
}

impl fmt::Display for Include {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Include::All => write!(f, "all"),
            Include::Optional => write!(f, "optional"),
            Include::Required => write!(f, "required"),
        }
    }
}

impl FromStr for Include {
    type Err = DatastoreEnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Include::All),
            "optional" => Ok(Include::Optional),
            "required" => Ok(Include::Required),
            other => Err(DatastoreEnvError::Usage(format!(
                "include must be one of all,optional,required (was: {other})"
            ))),
        }
    }
}

/// Options for [`upload_dot_env`].
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub env_file: PathBuf,
    pub include: Include,
    pub overwrite: bool,
    pub namespace: Option<String>,
    pub kind: Option<String>,
    pub project_id: Option<String>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        UploadOptions {
            env_file: PathBuf::from(DEFAULT_ENV_FILE),
            include: Include::default(),
            overwrite: false,
            namespace: None,
            kind: None,
            project_id: None,
        }
    }
}

impl UploadOptions {
    /// Resolver options addressing the same store location, with the store
    /// marked as required.
    pub fn environment_options(&self) -> EnvironmentOptions {
        let mut options = EnvironmentOptions::new().datastore_required(true);
        if let Some(ns) = &self.namespace {
            options = options.namespace(ns.as_str());
        }
        if let Some(kind) = &self.kind {
            options = options.kind(kind.as_str());
        }
        if let Some(id) = &self.project_id {
            options = options.project_id(id.as_str());
        }
        options
    }
}

/// What an upload did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub project_id: String,
    pub namespace: Option<String>,
    pub kind: String,
    pub written: Vec<String>,
}

/// Uploads the selected keys of `options.env_file` through `env`'s store.
///
/// `env` must have been built with the store available, typically from
/// [`UploadOptions::environment_options`].
pub async fn upload_dot_env(
    options: &UploadOptions,
    env: &DatastoreEnvironment,
) -> Result<UploadSummary, DatastoreEnvError> {
    let project_id = env
        .project_id()
        .ok_or_else(|| DatastoreEnvError::Configuration("upload requires a datastore".into()))?
        .to_owned();

    info!("Loading settings from {} ...", options.env_file.display());
    let settings = scan_dot_env(&options.env_file).await?;

    let selected: Vec<String> = settings
        .iter()
        .filter(|(_, s)| match options.include {
            Include::All => true,
            Include::Optional => s.required || s.optional,
            Include::Required => s.required,
        })
        .map(|(k, _)| k.to_uppercase())
        .collect();

    let store: &Arc<dyn KeyValueStore> = env.store();

    let existing: HashSet<String> = if options.overwrite || selected.is_empty() {
        HashSet::new()
    } else {
        store
            .get_many(&env.store_keys(&selected))
            .await?
            .into_iter()
            .map(|e| e.key.name)
            .collect()
    };

    let written: Vec<String> = selected
        .into_iter()
        .filter(|k| !existing.contains(k))
        .collect();

    let opts = env.options();
    info!(
        project_id = %project_id,
        namespace = opts.namespace.as_deref().unwrap_or_default(),
        kind = %opts.kind,
        include = %options.include,
        "Saving {} settings",
        written.len()
    );

    let entities: Vec<Entity> = settings
        .iter()
        .filter(|(k, _)| written.contains(&k.to_uppercase()))
        .map(|(k, s)| Entity::new(env.store_key(k), s.value.as_str()))
        .collect();

    if !entities.is_empty() {
        if options.overwrite {
            store.save(entities).await?;
        } else {
            store.insert(entities).await?;
        }
    }

    info!("Done");

    Ok(UploadSummary {
        project_id,
        namespace: opts.namespace.clone(),
        kind: opts.kind.clone(),
        written,
    })
}
