// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output is always installed. With the `file-logging` feature and a
//! log directory, a JSON log is also written per run:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── pupil.log
//! ```

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDateTime, Utc};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LoggingOptions, DEFAULT_RETENTION_RUNS};

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Keeps log writers alive; drop it only at program exit
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder of this process, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Install the global tracing subscriber
///
/// # Errors
///
/// Fails if the filter is invalid, the run folder cannot be created, or a
/// global subscriber is already set.
pub fn init_logging(debug_flags: &CrateDebugFlags, options: &LoggingOptions) -> Result<LoggingGuard> {
    let filter = debug_flags.to_filter_string_with_default(options.base_level());
    let env_filter = EnvFilter::try_new(&filter)
        .with_context(|| format!("Invalid log filter: {}", filter))?;

    let mut layers = Vec::new();
    layers.push(
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_filter(env_filter)
            .boxed(),
    );

    let mut guard = LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: Vec::new(),
        log_dir: None,
    };

    if let Some(base_log_dir) = &options.log_dir {
        let run_folder = create_run_folder(base_log_dir)?;
        cleanup_old_runs(
            base_log_dir,
            options.retention_runs.unwrap_or(DEFAULT_RETENTION_RUNS),
        )?;

        #[cfg(feature = "file-logging")]
        {
            let appender = tracing_appender::rolling::never(&run_folder, "pupil.log");
            let (non_blocking, file_guard) = tracing_appender::non_blocking(appender);
            guard._file_guards.push(file_guard);
            layers.push(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json()
                    .with_filter(EnvFilter::new(&filter))
                    .boxed(),
            );
        }
        #[cfg(not(feature = "file-logging"))]
        eprintln!(
            "Warning: log directory {} ignored, built without file-logging",
            run_folder.display()
        );

        guard.log_dir = Some(run_folder);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(guard)
}

/// Console-only logging driven by the debug flags
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(debug_flags, &LoggingOptions::default())
}

fn create_run_folder(base_log_dir: &Path) -> Result<PathBuf> {
    let timestamp = Utc::now().format(RUN_TIMESTAMP_FORMAT);
    let run_folder = base_log_dir.join(format!("{}{}", RUN_PREFIX, timestamp));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
    Ok(run_folder)
}

/// Remove all but the `retention_runs` most recent run folders
///
/// Folders whose name does not parse as a run timestamp are left alone.
pub fn cleanup_old_runs(base_log_dir: &Path, retention_runs: usize) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }

    let mut runs: Vec<(PathBuf, NaiveDateTime)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let started = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
            .and_then(|ts| NaiveDateTime::parse_from_str(ts, RUN_TIMESTAMP_FORMAT).ok());
        if let Some(started) = started {
            runs.push((path, started));
        }
    }

    if runs.len() <= retention_runs {
        return Ok(0);
    }

    // Oldest first
    runs.sort_by_key(|(_, started)| *started);
    let to_remove = runs.len() - retention_runs;
    let mut removed = 0;
    for (path, _) in runs.iter().take(to_remove) {
        match std::fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            ),
        }
    }
    Ok(removed)
}
