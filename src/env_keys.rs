// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Environment Keys
//!
//! This module contains constant definitions for environment variable keys and
//! fixed values used throughout the crate.
//!
//! The resolver reads these variables to decide whether the remote store can be
//! reached and which cloud project it lives in. The CLI uses the file name
//! defaults.

/// Placeholder written to the store in place of a missing required value.
pub const PLACEHOLDER: &str = "** __ SET THIS __ **";

/// Default entity kind for environment entries.
pub const DEFAULT_KIND: &str = "Env";

/// Name of the entity property holding the value.
pub const VALUE_PROPERTY: &str = "value";

/// Store availability signals
pub const GOOGLE_APPLICATION_CREDENTIALS_ENV_KEY: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const DATASTORE_EMULATOR_HOST_ENV_KEY: &str = "DATASTORE_EMULATOR_HOST";
pub const DATASTORE_PROJECT_ID_ENV_KEY: &str = "DATASTORE_PROJECT_ID";
pub const GOOGLE_CLOUD_PROJECT_ENV_KEY: &str = "GOOGLE_CLOUD_PROJECT";

/// Generic project variable, consulted after the datastore specific ones.
pub const PROJECT_ENV_KEY: &str = "PROJECT";

/// Bearer token handed to the REST client when talking to the real service.
pub const GOOGLE_OAUTH_ACCESS_TOKEN_ENV_KEY: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Any one of these being set makes the store available.
pub const AVAILABILITY_SIGNALS: [&str; 4] = [
    GOOGLE_APPLICATION_CREDENTIALS_ENV_KEY,
    DATASTORE_EMULATOR_HOST_ENV_KEY,
    DATASTORE_PROJECT_ID_ENV_KEY,
    GOOGLE_CLOUD_PROJECT_ENV_KEY,
];

/// Project id variables in precedence order.
pub const PROJECT_ID_ENV_KEYS: [&str; 3] = [
    DATASTORE_PROJECT_ID_ENV_KEY,
    GOOGLE_CLOUD_PROJECT_ENV_KEY,
    PROJECT_ENV_KEY,
];

/// Datastore endpoints
pub const DATASTORE_API_BASE: &str = "https://datastore.googleapis.com";
pub const DATASTORE_CONSOLE_BASE: &str = "https://console.cloud.google.com/datastore/entities";

/// Dot-file utility defaults
pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_REQUIRE_FILE: &str = "config/requiredEnv.js";
pub const STDOUT_TARGET: &str = "-";
