// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Store Availability
//!
//! A local, side-effect-free probe deciding whether remote store calls should be
//! attempted at all. It never opens a connection.

use crate::{env_keys::AVAILABILITY_SIGNALS, environment::EnvContext};
use std::sync::Arc;

/// Answers whether the remote store should be used.
pub trait StoreAvailability: Send + Sync {
    fn is_available(&self) -> bool;
}

/// Looks for any of the credential, emulator or project variables in an
/// environment context.
pub struct EnvProbe {
    env: Arc<dyn EnvContext>,
}

impl EnvProbe {
    pub fn new(env: Arc<dyn EnvContext>) -> EnvProbe {
        EnvProbe { env }
    }
}

impl StoreAvailability for EnvProbe {
    fn is_available(&self) -> bool {
        AVAILABILITY_SIGNALS.iter().any(|key| self.env.contains(key))
    }
}

/// A fixed answer, for tests and for callers that already know.
#[derive(Debug, Clone, Copy)]
pub struct Fixed(pub bool);

impl StoreAvailability for Fixed {
    fn is_available(&self) -> bool {
        self.0
    }
}
