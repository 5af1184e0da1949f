// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Datastore Environment
//!
//! This module provides [`DatastoreEnvironment`], which resolves a declared set
//! of required and optional keys from three tiers and reconciles the result.
//!
//! ## Precedence
//!
//! From lowest to highest:
//!
//! 1. **Defaults** supplied in [`EnvironmentOptions::defaults`].
//! 2. **Remote store** entries addressed by `(namespace, kind, KEY)`.
//! 3. **Process environment** variables.
//!
//! A local variable therefore always overrides shared remote configuration,
//! which in turn overrides static defaults.
//!
//! ## Self-healing
//!
//! When required keys are still missing after the merge, a placeholder entry is
//! inserted into the store for every missing key the pass did not already see,
//! and the operation then fails with [`DatastoreEnvError::MissingKeys`]. An
//! operator can fill in the placeholders from the console URL carried by the
//! error. Placeholder values are never treated as resolved.
//!
//! Provisioning is best-effort: insert failures (including another process
//! racing to insert the same placeholder) are ignored and never replace the
//! missing-keys error.
//!
//! ## Caching
//!
//! [`DatastoreEnvironment::load_environment`] caches its snapshot. Later calls
//! return the same [`Snapshot`] without touching the store until a refresh is
//! requested. Two racing first loads may both hit the store; the last one to
//! finish wins the cache.

use crate::{
    availability::{EnvProbe, StoreAvailability},
    env_keys::{
        DATASTORE_CONSOLE_BASE, DATASTORE_EMULATOR_HOST_ENV_KEY,
        GOOGLE_APPLICATION_CREDENTIALS_ENV_KEY, GOOGLE_OAUTH_ACCESS_TOKEN_ENV_KEY,
        PROJECT_ID_ENV_KEYS,
    },
    environment::{EnvContext, ProcessEnv},
    errors::{DatastoreEnvError, MissingKeysHint},
    options::EnvironmentOptions,
    store::{
        Entity, KeyValueStore, StoreKey,
        datastore::{DatastoreClient, DatastoreConfig},
        memory::MemoryStore,
    },
};
use parking_lot::RwLock;
use serde::Deserialize;
use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
    sync::Arc,
};
use tracing::{debug, warn};

/// The key/value mapping produced by one resolution pass.
pub type Snapshot = Arc<BTreeMap<String, String>>;

/// Result of a single pass: the merged values plus every key for which the
/// store returned an entry, placeholder or not.
struct Pass {
    values: BTreeMap<String, String>,
    seen: HashSet<String>,
}

/// Resolves and reconciles environment configuration.
///
/// Create one instance per process (or per test) and call
/// [`load_environment`](Self::load_environment) during startup.
///
/// # Example
///
/// ```rust,no_run
/// use datastore_env::{DatastoreEnvironment, EnvironmentOptions};
///
/// # async fn run() -> Result<(), datastore_env::errors::DatastoreEnvError> {
/// let options = EnvironmentOptions::new()
///     .required(["DATABASE_URL"])
///     .default_value("LOG_LEVEL", "info");
///
/// let env = DatastoreEnvironment::from_env(options)?;
/// let values = env.load_environment(false).await?;
/// println!("loaded {} variables", values.len());
/// # Ok(())
/// # }
/// ```
pub struct DatastoreEnvironment {
    options: EnvironmentOptions,
    store: Arc<dyn KeyValueStore>,
    env: Arc<dyn EnvContext>,
    available: bool,
    project_id: Option<String>,
    snapshot: RwLock<Option<Snapshot>>,
}

impl DatastoreEnvironment {
    /// Creates a resolver over the real process environment.
    ///
    /// Store availability is probed from the process environment.
    ///
    /// # Errors
    ///
    /// - `DatastoreEnvError::Configuration` when `datastore_required` is set
    ///   but no store signal is present, or when the store is available but no
    ///   project id can be resolved.
    pub fn new(
        options: EnvironmentOptions,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<DatastoreEnvironment, DatastoreEnvError> {
        let env: Arc<dyn EnvContext> = Arc::new(ProcessEnv);
        let probe = EnvProbe::new(env.clone());
        DatastoreEnvironment::with_context(options, store, env, &probe)
    }

    /// Creates a resolver over the real process environment, talking to Cloud
    /// Datastore (or its emulator) when any store signal is present.
    ///
    /// Without store signals the resolver runs on the environment and defaults
    /// alone, unless `datastore_required` is set.
    ///
    /// The client never obtains credentials itself. Against the real service
    /// a bearer token must be present in `GOOGLE_OAUTH_ACCESS_TOKEN`; with
    /// only `GOOGLE_APPLICATION_CREDENTIALS` set the store counts as available
    /// but every request is rejected as unauthenticated. A warning is logged
    /// when neither a token nor an emulator host is configured.
    pub fn from_env(options: EnvironmentOptions) -> Result<DatastoreEnvironment, DatastoreEnvError> {
        let env: Arc<dyn EnvContext> = Arc::new(ProcessEnv);
        let probe = EnvProbe::new(env.clone());

        let store: Arc<dyn KeyValueStore> = if probe.is_available() {
            let project_id = resolve_project_id(&options, env.as_ref())?;
            let cfg = DatastoreConfig::from_env(env.as_ref(), project_id);
            if cfg.access_token.is_none() && !env.contains(DATASTORE_EMULATOR_HOST_ENV_KEY) {
                warn!(
                    variable = GOOGLE_OAUTH_ACCESS_TOKEN_ENV_KEY,
                    "no access token set, datastore requests will be unauthenticated"
                );
            }
            Arc::new(DatastoreClient::new(cfg)?)
        } else {
            // never consulted while the store is unavailable
            Arc::new(MemoryStore::new())
        };

        DatastoreEnvironment::with_context(options, store, env, &probe)
    }

    /// Creates a resolver over an injected environment and availability check.
    ///
    /// Keys in `options` are canonicalized to upper case here, whether they
    /// came through the fluent setters or were written into the fields.
    pub fn with_context(
        options: EnvironmentOptions,
        store: Arc<dyn KeyValueStore>,
        env: Arc<dyn EnvContext>,
        availability: &dyn StoreAvailability,
    ) -> Result<DatastoreEnvironment, DatastoreEnvError> {
        let options = options.canonicalized();
        let available = availability.is_available();

        if options.datastore_required && !available {
            return Err(DatastoreEnvError::Configuration(
                "a datastore is required but none was found; set one of \
                 GOOGLE_APPLICATION_CREDENTIALS, DATASTORE_EMULATOR_HOST, \
                 DATASTORE_PROJECT_ID or GOOGLE_CLOUD_PROJECT"
                    .into(),
            ));
        }

        let project_id = if available {
            Some(resolve_project_id(&options, env.as_ref())?)
        } else {
            None
        };

        debug!(
            required = options.required.len(),
            optional = options.optional.len(),
            available,
            project_id = project_id.as_deref().unwrap_or_default(),
            "datastore environment created"
        );

        Ok(DatastoreEnvironment {
            options,
            store,
            env,
            available,
            project_id,
            snapshot: RwLock::new(None),
        })
    }

    /// The canonicalized options this resolver was built with.
    pub fn options(&self) -> &EnvironmentOptions {
        &self.options
    }

    /// The resolved project id, present whenever the store is available.
    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Whether the store was found available at construction.
    pub fn is_store_available(&self) -> bool {
        self.available
    }

    /// The remote store consulted for the middle tier.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// The cached snapshot of the last successful load, if any.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.snapshot.read().clone()
    }

    /// Address of `key` in the store.
    pub fn store_key(&self, key: &str) -> StoreKey {
        StoreKey::new(self.options.namespace.as_deref(), &self.options.kind, key)
    }

    /// Addresses of many keys, in order.
    pub fn store_keys<S: AsRef<str>>(&self, keys: &[S]) -> Vec<StoreKey> {
        keys.iter().map(|k| self.store_key(k.as_ref())).collect()
    }

    /// Loads every declared key into the environment context.
    ///
    /// Returns the cached snapshot when one exists and `refresh` is `false`;
    /// no store traffic happens in that case. Otherwise runs
    /// [`verify_environment`](Self::verify_environment) without the
    /// empty-declaration check, writes every resolved key into the environment
    /// and caches the result.
    ///
    /// This is the only place where the environment context is written.
    pub async fn load_environment(&self, refresh: bool) -> Result<Snapshot, DatastoreEnvError> {
        if !refresh {
            let cached = self.snapshot.read().clone();
            if let Some(snapshot) = cached {
                return Ok(snapshot);
            }
        }

        let values = self.verify_environment(false).await?;

        for (key, value) in &values {
            self.env.set(key, value);
        }

        let snapshot = Arc::new(values);
        *self.snapshot.write() = Some(snapshot.clone());

        debug!(keys = snapshot.len(), refresh, "environment loaded");

        Ok(snapshot)
    }

    /// Resolves the declared keys and checks that every required one is set.
    ///
    /// Never reads or fills the snapshot cache and never writes the
    /// environment; only [`load_environment`](Self::load_environment) does.
    ///
    /// # Errors
    ///
    /// - `DatastoreEnvError::Usage` when nothing is declared and
    ///   `fail_without_required` is `true`.
    /// - `DatastoreEnvError::MissingKeys` when required keys remain unresolved,
    ///   after placeholders were provisioned for them.
    /// - `DatastoreEnvError::Store` when the store call fails.
    pub async fn verify_environment(
        &self,
        fail_without_required: bool,
    ) -> Result<BTreeMap<String, String>, DatastoreEnvError> {
        if fail_without_required && self.options.required.is_empty() && self.options.optional.is_empty()
        {
            return Err(DatastoreEnvError::Usage(
                "Cannot verify environment with no required or optional keys specified".into(),
            ));
        }

        let pass = self.resolve().await?;

        let missing: Vec<String> = self
            .options
            .required
            .iter()
            .filter(|key| !pass.values.contains_key(*key))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(self.fail_missing(missing, &pass.seen).await);
        }

        Ok(pass.values)
    }

    /// Merges defaults, store values and environment values for the declared
    /// keys.
    ///
    /// Returns an empty mapping without any store call when nothing is declared.
    pub async fn fetch_and_merge_required(
        &self,
    ) -> Result<BTreeMap<String, String>, DatastoreEnvError> {
        Ok(self.resolve().await?.values)
    }

    /// Resolves a single key with the same precedence, bypassing the cache.
    ///
    /// # Errors
    ///
    /// `DatastoreEnvError::MissingKeys` naming only `key` when no tier has a
    /// value; a placeholder is provisioned for it first.
    pub async fn get(&self, key: &str) -> Result<String, DatastoreEnvError> {
        let key = key.to_uppercase();

        if let Some(value) = self.env.get(&key) {
            return Ok(value);
        }

        let mut seen = HashSet::new();
        if self.available {
            if let Some(entity) = self.store.get(&self.store_key(&key)).await? {
                seen.insert(key.clone());
                if entity.value != self.options.placeholder {
                    return Ok(entity.value);
                }
            }
        }

        if let Some(value) = self.options.defaults.get(&key) {
            return Ok(value.clone());
        }

        Err(self.fail_missing(vec![key], &seen).await)
    }

    /// Inserts a placeholder entry for each of `missing` not present in `seen`.
    ///
    /// Each key is inserted on its own so a collision on one key does not stop
    /// the others. Failures are ignored. Does nothing when the store is not
    /// available. Returns the number of placeholders written.
    pub async fn set_placeholders(&self, missing: &[String], seen: &HashSet<String>) -> usize {
        if !self.available {
            return 0;
        }

        let mut written = 0;
        for key in missing.iter().filter(|k| !seen.contains(*k)) {
            let entity = Entity::new(self.store_key(key), self.options.placeholder.as_str());
            match self.store.insert(vec![entity]).await {
                Ok(()) => written += 1,
                Err(err) => debug!(key = %key, error = %err, "placeholder not written"),
            }
        }

        written
    }

    /// URL of the store's entity browser for this resolver's kind and namespace.
    pub fn console_url(&self) -> Option<String> {
        let project = self.project_id.as_deref()?;
        let mut url = format!(
            "{DATASTORE_CONSOLE_BASE}/query?project={project}&kind={}",
            self.options.kind
        );
        if let Some(ns) = &self.options.namespace {
            url.push_str("&ns=");
            url.push_str(ns);
        }
        Some(url)
    }

    async fn resolve(&self) -> Result<Pass, DatastoreEnvError> {
        let declared = self.options.declared();
        let mut pass = Pass {
            values: BTreeMap::new(),
            seen: HashSet::new(),
        };

        if declared.is_empty() {
            return Ok(pass);
        }

        let (from_env, remainder): (Vec<String>, Vec<String>) =
            declared.into_iter().partition(|key| self.env.contains(key));

        let mut from_store = BTreeMap::new();
        if self.available && !remainder.is_empty() {
            let entities = self.store.get_many(&self.store_keys(&remainder)).await?;
            for entity in entities {
                pass.seen.insert(entity.key.name.clone());
                if entity.value != self.options.placeholder {
                    from_store.insert(entity.key.name, entity.value);
                }
            }
        }

        debug!(
            env = from_env.len(),
            store = from_store.len(),
            defaults = self.options.defaults.len(),
            "resolution pass"
        );

        pass.values.extend(
            self.options
                .defaults
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        pass.values.extend(from_store);
        for key in from_env {
            if let Some(value) = self.env.get(&key) {
                pass.values.insert(key, value);
            }
        }

        Ok(pass)
    }

    async fn fail_missing(&self, missing: Vec<String>, seen: &HashSet<String>) -> DatastoreEnvError {
        self.set_placeholders(&missing, seen).await;

        let hint = match self.console_url() {
            Some(url) if self.available => MissingKeysHint::Console { url },
            _ => MissingKeysHint::EnvironmentOnly,
        };

        DatastoreEnvError::missing_keys(missing, hint)
    }
}

#[derive(Deserialize)]
struct CredentialFile {
    project_id: Option<String>,
}

/// Finds the cloud project id.
///
/// Precedence: the explicit option, then `DATASTORE_PROJECT_ID`,
/// `GOOGLE_CLOUD_PROJECT`, `PROJECT`, and finally the `project_id` field of the
/// service-account file named by `GOOGLE_APPLICATION_CREDENTIALS`.
pub fn resolve_project_id(
    options: &EnvironmentOptions,
    env: &dyn EnvContext,
) -> Result<String, DatastoreEnvError> {
    if let Some(id) = options.project_id.as_ref().filter(|id| !id.is_empty()) {
        return Ok(id.clone());
    }

    if let Some(id) = PROJECT_ID_ENV_KEYS
        .iter()
        .filter_map(|key| env.get(key))
        .find(|id| !id.is_empty())
    {
        return Ok(id);
    }

    if let Some(path) = env.get(GOOGLE_APPLICATION_CREDENTIALS_ENV_KEY) {
        if let Some(id) = project_id_from_credentials(Path::new(&path))? {
            return Ok(id);
        }
    }

    Err(DatastoreEnvError::Configuration(
        "no project id found; pass one explicitly or set DATASTORE_PROJECT_ID".into(),
    ))
}

fn project_id_from_credentials(path: &Path) -> Result<Option<String>, DatastoreEnvError> {
    let content = std::fs::read_to_string(path).map_err(|e| DatastoreEnvError::io(path, e))?;
    let credentials: CredentialFile =
        serde_json::from_str(&content).map_err(|source| DatastoreEnvError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(credentials.project_id.filter(|id| !id.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{availability::Fixed, environment::MemoryEnv, store::memory::MemoryStore};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn resolver(
        options: EnvironmentOptions,
        env: MemoryEnv,
        store: Arc<MemoryStore>,
        available: bool,
    ) -> DatastoreEnvironment {
        DatastoreEnvironment::with_context(options, store, Arc::new(env), &Fixed(available)).unwrap()
    }

    #[test]
    fn project_id_precedence() {
        let env = MemoryEnv::new()
            .with("PROJECT", "generic")
            .with("GOOGLE_CLOUD_PROJECT", "alternate");

        let options = EnvironmentOptions::new();
        assert_eq!(resolve_project_id(&options, &env).unwrap(), "alternate");

        let env = env.with("DATASTORE_PROJECT_ID", "primary");
        assert_eq!(resolve_project_id(&options, &env).unwrap(), "primary");

        let options = options.project_id("explicit");
        assert_eq!(resolve_project_id(&options, &env).unwrap(), "explicit");
    }

    #[test]
    fn project_id_from_credential_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"type":"service_account","project_id":"from-file"}}"#).unwrap();

        let env = MemoryEnv::new().with(
            "GOOGLE_APPLICATION_CREDENTIALS",
            file.path().to_str().unwrap(),
        );

        assert_eq!(
            resolve_project_id(&EnvironmentOptions::new(), &env).unwrap(),
            "from-file"
        );
    }

    #[test]
    fn missing_project_id_is_a_configuration_error() {
        let err = resolve_project_id(&EnvironmentOptions::new(), &MemoryEnv::new()).unwrap_err();
        assert!(matches!(err, DatastoreEnvError::Configuration(_)));
    }

    #[test]
    fn datastore_required_fails_fast() {
        let result = DatastoreEnvironment::with_context(
            EnvironmentOptions::new().datastore_required(true),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryEnv::new()),
            &Fixed(false),
        );

        assert!(matches!(result, Err(DatastoreEnvError::Configuration(_))));
    }

    #[test]
    fn console_url_includes_namespace() {
        let env = resolver(
            EnvironmentOptions::new()
                .project_id("p")
                .namespace("staging")
                .kind("Config"),
            MemoryEnv::new(),
            Arc::new(MemoryStore::new()),
            true,
        );

        assert_eq!(
            env.console_url().unwrap(),
            "https://console.cloud.google.com/datastore/entities/query?project=p&kind=Config&ns=staging"
        );
    }

    #[tokio::test]
    async fn nothing_declared_merges_to_empty_without_store_call() {
        let store = Arc::new(MemoryStore::new());
        let env = resolver(
            EnvironmentOptions::new().project_id("p").default_value("A", "1"),
            MemoryEnv::new(),
            store.clone(),
            true,
        );

        assert!(env.fetch_and_merge_required().await.unwrap().is_empty());
        assert_eq!(store.reads(), 0);
    }

    #[tokio::test]
    async fn verify_with_nothing_declared_is_a_usage_error() {
        let env = resolver(
            EnvironmentOptions::new(),
            MemoryEnv::new(),
            Arc::new(MemoryStore::new()),
            false,
        );

        let err = env.verify_environment(true).await.unwrap_err();
        assert!(matches!(err, DatastoreEnvError::Usage(_)));
        assert!(env.verify_environment(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn env_satisfied_keys_skip_the_store() {
        let store = Arc::new(MemoryStore::new());
        let env = resolver(
            EnvironmentOptions::new().project_id("p").required(["A"]),
            MemoryEnv::new().with("A", "env"),
            store.clone(),
            true,
        );

        let values = env.fetch_and_merge_required().await.unwrap();

        assert_eq!(values.get("A").map(String::as_str), Some("env"));
        assert_eq!(store.reads(), 0);
    }

    #[tokio::test]
    async fn placeholder_already_in_store_is_not_reinserted() {
        let store = Arc::new(MemoryStore::new());
        let env = resolver(
            EnvironmentOptions::new().project_id("p").required(["A", "B"]),
            MemoryEnv::new(),
            store.clone(),
            true,
        );
        store.put(env.store_key("A"), "** __ SET THIS __ **");

        let err = env.verify_environment(true).await.unwrap_err();

        assert_eq!(err.missing(), Some(&["A".to_string(), "B".to_string()][..]));
        assert_eq!(store.inserts(), 1);
        assert_eq!(
            store.value(&env.store_key("B")).as_deref(),
            Some("** __ SET THIS __ **")
        );
    }

    #[tokio::test]
    async fn get_prefers_env_then_store_then_defaults() {
        let store = Arc::new(MemoryStore::new());
        let env = resolver(
            EnvironmentOptions::new()
                .project_id("p")
                .default_value("A", "default-a")
                .default_value("B", "default-b")
                .default_value("C", "default-c"),
            MemoryEnv::new().with("A", "env-a"),
            store.clone(),
            true,
        );
        store.put(env.store_key("A"), "store-a");
        store.put(env.store_key("B"), "store-b");

        assert_eq!(env.get("a").await.unwrap(), "env-a");
        assert_eq!(env.get("b").await.unwrap(), "store-b");
        assert_eq!(env.get("c").await.unwrap(), "default-c");
    }

    #[tokio::test]
    async fn get_missing_key_provisions_and_fails() {
        let store = Arc::new(MemoryStore::new());
        let env = resolver(
            EnvironmentOptions::new().project_id("p"),
            MemoryEnv::new(),
            store.clone(),
            true,
        );

        let err = env.get("secret").await.unwrap_err();

        assert_eq!(err.missing(), Some(&["SECRET".to_string()][..]));
        assert_eq!(
            store.value(&env.store_key("SECRET")).as_deref(),
            Some("** __ SET THIS __ **")
        );

        // The placeholder is seen on the next call, so nothing is inserted again.
        let err = env.get("secret").await.unwrap_err();
        assert!(err.missing().is_some());
        assert_eq!(store.inserts(), 1);
    }

    #[tokio::test]
    async fn provisioning_failure_does_not_mask_missing_keys() {
        let store = Arc::new(MemoryStore::new());
        store.fail_writes(true);
        let env = resolver(
            EnvironmentOptions::new().project_id("p").required(["A"]),
            MemoryEnv::new(),
            store.clone(),
            true,
        );

        let err = env.verify_environment(true).await.unwrap_err();

        assert_eq!(err.missing(), Some(&["A".to_string()][..]));
        assert!(store.is_empty());
    }
}
