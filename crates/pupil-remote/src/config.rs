// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Connection settings for a [`crate::Communicator`]

use crate::error::{RemoteError, Result};
use pupil_config::{PupilConfig, DEFAULT_ADDRESS, DEFAULT_REQUEST_PORT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Communicator configuration builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicatorConfig {
    /// Transport and host without port, e.g. `tcp://127.0.0.1`
    pub address: String,

    /// Pupil Remote command port (ZMQ REQ)
    pub request_port: u16,

    /// Wait for the command socket to connect before returning
    pub block_until_connected: bool,

    /// Connect wait bound in milliseconds (0 = unbounded)
    pub connect_timeout_ms: u64,
}

impl Default for CommunicatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CommunicatorConfig {
    /// Local Pupil Remote on its default port
    ///
    /// # Example
    /// ```
    /// use pupil_remote::CommunicatorConfig;
    ///
    /// let config = CommunicatorConfig::new()
    ///     .with_address("tcp://192.168.1.20")
    ///     .with_connect_timeout_ms(2000);
    /// assert_eq!(config.request_endpoint(), "tcp://192.168.1.20:50020");
    /// ```
    pub fn new() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            request_port: DEFAULT_REQUEST_PORT,
            block_until_connected: true,
            connect_timeout_ms: 0,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_request_port(mut self, port: u16) -> Self {
        self.request_port = port;
        self
    }

    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    pub fn with_block_until_connected(mut self, block: bool) -> Self {
        self.block_until_connected = block;
        self
    }

    /// Take the `[remote]` section of a loaded configuration
    pub fn from_config(config: &PupilConfig) -> Self {
        let remote = &config.remote;
        Self {
            address: remote.address.clone(),
            request_port: remote.request_port,
            block_until_connected: remote.block_until_connected,
            connect_timeout_ms: remote.connect_timeout_ms,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(RemoteError::InvalidConfig(
                "address cannot be empty".to_string(),
            ));
        }
        if !pupil_config::validation::SUPPORTED_SCHEMES
            .iter()
            .any(|scheme| self.address.starts_with(scheme))
        {
            return Err(RemoteError::InvalidConfig(format!(
                "address '{}' has no supported transport scheme",
                self.address
            )));
        }
        if self.request_port == 0 {
            return Err(RemoteError::InvalidConfig(
                "request_port must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_ms > 0).then(|| Duration::from_millis(self.connect_timeout_ms))
    }

    /// Endpoint of the command socket
    pub fn request_endpoint(&self) -> String {
        format!("{}:{}", self.address, self.request_port)
    }

    /// Endpoint of the publisher reported by `SUB_PORT`
    pub fn subscription_endpoint(&self, port: u16) -> String {
        format!("{}:{}", self.address, port)
    }
}
