// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Pupil Remote client
//!
//! Controls a running Pupil application (Capture or Service) over Pupil
//! Remote and consumes the events it publishes.
//!
//! ## Features
//! - Blocking command channel (recording, calibration, raw commands)
//! - Notifications (`notify.<subject>`)
//! - Prefix-matched subscriptions on separate notification and data channels
//! - Waiting for any or all of a set of events with a decaying timeout
//! - Callbacks run synchronously after every poll or wait
//!
//! ## Quick Start
//!
//! ```no_run
//! use pupil_remote::{Callback, Communicator, CommunicatorConfig};
//! use std::time::Duration;
//!
//! let mut remote = Communicator::connect(&CommunicatorConfig::new())?;
//!
//! let on_pupil = Callback::new(|event, payload| {
//!     println!("{}: {:?}", event, payload.get("diameter"));
//!     Ok(())
//! });
//! remote.add_callback(&on_pupil, &["pupil"])?;
//!
//! for _ in 0..100 {
//!     remote.check_all_available()?;
//!     std::thread::sleep(Duration::from_millis(50));
//! }
//!
//! remote.remove_callback(&on_pupil, &["pupil"])?;
//! # Ok::<(), pupil_remote::RemoteError>(())
//! ```
//!
//! A communicator is not thread safe. Use one per thread.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod callbacks;
pub mod codec;
pub mod communicator;
pub mod config;
pub mod error;
pub mod events;
pub mod poller;
pub mod reconnect;
pub mod subscriptions;
pub mod topic;
pub mod transport;
pub mod wait;

pub use callbacks::{Callback, CallbackRegistry, HandlerResult};
pub use codec::{Payload, TIME_OF_ARRIVAL_KEY};
pub use communicator::Communicator;
pub use config::CommunicatorConfig;
pub use error::{HandlerError, RemoteError, Result};
pub use events::EventSet;
pub use reconnect::{retry_with_backoff, ReconnectionStrategy};
pub use subscriptions::{Permanence, SubscriptionRegistry};
pub use transport::{Channel, InMemoryTransport, Transport, ZmqTransport};
pub use wait::WaitMode;
