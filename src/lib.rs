// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # pupil-interface
//!
//! Client-side event interface for Pupil eye tracking applications. Issues
//! commands and notifications over Pupil Remote, subscribes to the data and
//! notifications the application publishes, and waits for or reacts to them.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! pupil-interface = "0.1"
//! ```
//!
//! ```rust,no_run
//! use pupil_interface::prelude::*;
//! use std::time::Duration;
//!
//! let config = pupil_interface::config::load_config(None, None)?;
//! let mut remote = Communicator::connect(&CommunicatorConfig::from_config(&config))?;
//!
//! remote.start_recording(Some("trial_01"))?;
//! let events = remote.wait_any(&["notify.recording.started"], Some(Duration::from_secs(5)))?;
//! assert!(events.contains("notify.recording.started"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: pupil-config, pupil-observability          │
//! │  (TOML + overrides, tracing setup)                      │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  I/O: pupil-remote                                      │
//! │  (REQ command channel, notification + data SUB sockets, │
//! │   polling, waiting, callbacks)                          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **`file-logging`**: JSON log file per run in addition to the console
//!
//! ## License
//!
//! Apache-2.0

pub use pupil_config as config;
pub use pupil_observability as observability;
pub use pupil_remote as remote;

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::remote::{
        Callback, Communicator, CommunicatorConfig, EventSet, Payload, RemoteError,
        ReconnectionStrategy, WaitMode,
    };
}
