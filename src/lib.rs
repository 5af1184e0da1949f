// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Datastore Env
//!
//! `datastore_env` manages environment-variable configuration for server
//! processes. Values come from three tiers, lowest precedence first: static
//! defaults, entries in Cloud Datastore, and the process environment.
//!
//! ## Features
//!
//! - Declared required and optional keys, merged across the three tiers
//! - Missing required keys get a placeholder entry in the datastore and a
//!   console link in the error, so an operator can fill them in
//! - Cached, idempotent loading into the process environment
//! - Dot-env scanning, required-key manifest generation and dot-env upload
//!
//! ## Example
//!
//! ```rust,no_run
//! use datastore_env::{DatastoreEnvironment, EnvironmentOptions};
//!
//! async fn setup_env() -> Result<(), Box<dyn std::error::Error>> {
//!     let env = DatastoreEnvironment::from_env(
//!         EnvironmentOptions::new()
//!             .required(["DATABASE_URL", "API_KEY"])
//!             .optional(["SENTRY_DSN"])
//!             .namespace("production"),
//!     )?;
//!
//!     env.load_environment(false).await?;
//!     Ok(())
//! }
//! ```

pub mod availability;
pub mod dotenv;
pub mod env_keys;
pub mod environment;
pub mod errors;
pub mod manifest;
mod options;
mod resolver;
pub mod store;
pub mod upload;

pub use options::EnvironmentOptions;
pub use resolver::{DatastoreEnvironment, Snapshot, resolve_project_id};
