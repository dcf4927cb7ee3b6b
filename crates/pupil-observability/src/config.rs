// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging options

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Run folders kept when no retention is given
pub const DEFAULT_RETENTION_RUNS: usize = 10;

/// Options for [`crate::init_logging`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default level for crates without a debug flag (trace, debug, info, warn, error)
    pub level: Option<String>,

    /// Base directory for per-run log folders; console only when `None`
    pub log_dir: Option<PathBuf>,

    /// Keep the N most recent run folders
    pub retention_runs: Option<usize>,
}

impl LoggingOptions {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    pub fn with_retention_runs(mut self, runs: usize) -> Self {
        self.retention_runs = Some(runs);
        self
    }

    pub fn base_level(&self) -> &str {
        self.level.as_deref().unwrap_or("info")
    }
}
