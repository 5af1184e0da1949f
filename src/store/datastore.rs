// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Cloud Datastore Client
//!
//! A [`KeyValueStore`] backed by the Cloud Datastore v1 REST API.
//!
//! Only two endpoints are needed:
//!
//! - `projects/{project}:lookup` for reads. Deferred keys are looked up again
//!   until the service has answered for all of them, for a bounded number of
//!   rounds.
//! - `projects/{project}:commit` in `NON_TRANSACTIONAL` mode for writes, using
//!   `insert` mutations for [`KeyValueStore::insert`] and `upsert` mutations for
//!   [`KeyValueStore::save`]. Large batches are split into commits of at most
//!   500 mutations, so a failure part way through leaves earlier chunks written.
//!
//! When `DATASTORE_EMULATOR_HOST` is set the client talks plain HTTP to the
//! emulator. Against the real service a bearer token must be supplied from the
//! outside; obtaining one is not this client's job.

use super::{Entity, KeyValueStore, StoreKey};
use crate::{
    env_keys::{
        DATASTORE_API_BASE, DATASTORE_EMULATOR_HOST_ENV_KEY, GOOGLE_OAUTH_ACCESS_TOKEN_ENV_KEY,
        VALUE_PROPERTY,
    },
    environment::EnvContext,
    errors::StoreError,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Lookup round trips allowed before still-deferred keys are an error.
const MAX_LOOKUP_ROUNDS: usize = 10;

/// Mutations the service accepts in one commit.
const MAX_MUTATIONS_PER_COMMIT: usize = 500;

/// Connection settings for [`DatastoreClient`].
#[derive(Debug, Clone)]
pub struct DatastoreConfig {
    pub project_id: String,
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl DatastoreConfig {
    /// Settings for `project_id` against the public endpoint.
    pub fn new(project_id: impl Into<String>) -> DatastoreConfig {
        DatastoreConfig {
            project_id: project_id.into(),
            base_url: DATASTORE_API_BASE.to_owned(),
            access_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Settings derived from an environment: the emulator host when present,
    /// and the bearer token variable.
    pub fn from_env(env: &dyn EnvContext, project_id: impl Into<String>) -> DatastoreConfig {
        let mut cfg = DatastoreConfig::new(project_id);
        if let Some(host) = env.get(DATASTORE_EMULATOR_HOST_ENV_KEY) {
            cfg.base_url = if host.starts_with("http://") || host.starts_with("https://") {
                host
            } else {
                format!("http://{host}")
            };
        }
        cfg.access_token = env
            .get(GOOGLE_OAUTH_ACCESS_TOKEN_ENV_KEY)
            .filter(|t| !t.trim().is_empty());
        cfg
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

/// HTTP client for the Datastore REST API.
pub struct DatastoreClient {
    client: reqwest::Client,
    cfg: DatastoreConfig,
}

impl DatastoreClient {
    pub fn new(cfg: DatastoreConfig) -> Result<DatastoreClient, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| StoreError::Request(format!("failed to build http client: {e}")))?;

        debug!(
            project_id = %cfg.project_id,
            base_url = %cfg.base_url,
            auth_configured = cfg.access_token.is_some(),
            "datastore client initialized"
        );

        Ok(DatastoreClient { client, cfg })
    }

    pub fn project_id(&self) -> &str {
        &self.cfg.project_id
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1/projects/{}:{method}",
            self.cfg.base_url.trim_end_matches('/'),
            self.cfg.project_id
        )
    }

    async fn post<B, R>(&self, method: &str, body: &B) -> Result<R, StoreError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let mut request = self.client.post(self.endpoint(method)).json(body);
        if let Some(token) = &self.cfg.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(StoreError::Response {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn commit(&self, mut mutations: Vec<Mutation>) -> Result<(), StoreError> {
        while !mutations.is_empty() {
            let rest = mutations.split_off(mutations.len().min(MAX_MUTATIONS_PER_COMMIT));
            let body = CommitRequest {
                mode: "NON_TRANSACTIONAL",
                mutations,
            };
            self.post::<_, serde_json::Value>("commit", &body).await?;
            mutations = rest;
        }
        Ok(())
    }

    fn to_api_key(&self, key: &StoreKey) -> ApiKey {
        ApiKey {
            partition_id: PartitionId {
                project_id: Some(self.cfg.project_id.clone()),
                namespace_id: key.namespace.clone(),
            },
            path: vec![PathElement {
                kind: key.kind.clone(),
                name: Some(key.name.clone()),
            }],
        }
    }

    fn to_api_entity(&self, entity: Entity) -> ApiEntity {
        let mut properties = HashMap::new();
        properties.insert(
            VALUE_PROPERTY.to_owned(),
            Value {
                string_value: Some(entity.value),
                exclude_from_indexes: Some(true),
            },
        );
        ApiEntity {
            key: self.to_api_key(&entity.key),
            properties,
        }
    }
}

fn from_api_entity(mut entity: ApiEntity) -> Result<Entity, StoreError> {
    let element = entity
        .key
        .path
        .pop()
        .ok_or_else(|| StoreError::Decode("entity key has an empty path".into()))?;
    let kind = element.kind;
    let name = element
        .name
        .ok_or_else(|| StoreError::Decode(format!("{kind} entity has no key name")))?;

    let value = entity
        .properties
        .get(VALUE_PROPERTY)
        .and_then(|v| v.string_value.clone())
        .ok_or_else(|| StoreError::Decode(format!("entity `{name}` has no string value")))?;

    let key = StoreKey {
        namespace: entity.key.partition_id.namespace_id.filter(|ns| !ns.is_empty()),
        kind,
        name,
    };

    Ok(Entity { key, value })
}

#[async_trait]
impl KeyValueStore for DatastoreClient {
    async fn get_many(&self, keys: &[StoreKey]) -> Result<Vec<Entity>, StoreError> {
        let mut pending: Vec<ApiKey> = keys.iter().map(|k| self.to_api_key(k)).collect();
        let mut found = Vec::new();
        let mut rounds = 0;

        while !pending.is_empty() {
            if rounds == MAX_LOOKUP_ROUNDS {
                return Err(StoreError::Request(format!(
                    "{} keys still deferred after {MAX_LOOKUP_ROUNDS} lookups",
                    pending.len()
                )));
            }
            rounds += 1;

            let response: LookupResponse =
                self.post("lookup", &LookupRequest { keys: pending }).await?;

            for result in response.found {
                found.push(from_api_entity(result.entity)?);
            }
            pending = response.deferred;
        }

        Ok(found)
    }

    async fn insert(&self, entities: Vec<Entity>) -> Result<(), StoreError> {
        let names: Vec<String> = entities.iter().map(|e| e.key.name.clone()).collect();
        let mutations = entities
            .into_iter()
            .map(|e| Mutation::Insert(self.to_api_entity(e)))
            .collect();

        match self.commit(mutations).await {
            Err(StoreError::Response { status, .. }) if status == StatusCode::CONFLICT.as_u16() => {
                Err(StoreError::AlreadyExists(names.join(",")))
            }
            other => other,
        }
    }

    async fn save(&self, entities: Vec<Entity>) -> Result<(), StoreError> {
        let mutations = entities
            .into_iter()
            .map(|e| Mutation::Upsert(self.to_api_entity(e)))
            .collect();
        self.commit(mutations).await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartitionId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PathElement {
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiKey {
    partition_id: PartitionId,
    path: Vec<PathElement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Value {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exclude_from_indexes: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiEntity {
    key: ApiKey,
    #[serde(default)]
    properties: HashMap<String, Value>,
}

#[derive(Debug, Serialize)]
struct LookupRequest {
    keys: Vec<ApiKey>,
}

#[derive(Debug, Deserialize)]
struct EntityResult {
    entity: ApiEntity,
}

#[derive(Debug, Default, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    found: Vec<EntityResult>,
    #[serde(default)]
    deferred: Vec<ApiKey>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Mutation {
    Insert(ApiEntity),
    Upsert(ApiEntity),
}

#[derive(Debug, Serialize)]
struct CommitRequest {
    mode: &'static str,
    mutations: Vec<Mutation>,
}
