// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Each struct maps to a section of `pupil_remote.toml`.

use serde::{Deserialize, Serialize};

/// Default Pupil Remote address
pub const DEFAULT_ADDRESS: &str = "tcp://127.0.0.1";

/// Default Pupil Remote request port
pub const DEFAULT_REQUEST_PORT: u16 = 50020;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PupilConfig {
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

/// Connection to Pupil Remote
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Transport and host, without port (e.g. `tcp://127.0.0.1`)
    pub address: String,
    pub request_port: u16,
    /// Wait for the command socket to connect before returning
    pub block_until_connected: bool,
    /// Bound on the connect wait in milliseconds (0 = unbounded)
    pub connect_timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            request_port: DEFAULT_REQUEST_PORT,
            block_until_connected: true,
            connect_timeout_ms: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
