// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # pupil-observability
//!
//! Logging setup shared by the Pupil Remote crates and binaries, with
//! per-crate debug flag support.
//!
//! ## Features
//! - `file-logging`: JSON log files in a timestamped folder per run

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Crate names accepted by `--debug-<crate>` and `PUPIL_DEBUG`
pub const KNOWN_CRATES: &[&str] = &[
    "pupil-remote",
    "pupil-config",
    "pupil-observability",
    "pupil-interface",
];
