// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pupil Remote client
//!
//! Not thread safe: keep one [`Communicator`] per thread of control.

use crate::callbacks::{Callback, CallbackRegistry, Removal};
use crate::codec::{encode_payload, Payload};
use crate::config::CommunicatorConfig;
use crate::error::{RemoteError, Result};
use crate::events::EventSet;
use crate::poller;
use crate::subscriptions::SubscriptionRegistry;
use crate::transport::{Transport, ZmqTransport, NOTIFY_PREFIX};
use crate::wait::{wait_for_events, WaitMode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Command asking Pupil Remote for its publisher port
pub const SUB_PORT_COMMAND: &str = "SUB_PORT";

/// Main Pupil Remote client
///
/// Owns the command channel, both subscription channels, the active
/// subscriptions and the registered callbacks.
///
/// # Example
/// ```no_run
/// use pupil_remote::{Communicator, CommunicatorConfig};
/// use std::time::Duration;
///
/// let mut remote = Communicator::connect(&CommunicatorConfig::new())?;
/// remote.start_calibration()?;
/// let events = remote.wait_any(
///     &["notify.calibration.successful", "notify.calibration.failed"],
///     Some(Duration::from_secs(60)),
/// )?;
/// if events.contains("notify.calibration.successful") {
///     remote.start_recording(Some("session_1"))?;
/// }
/// # Ok::<(), pupil_remote::RemoteError>(())
/// ```
pub struct Communicator<T: Transport = ZmqTransport> {
    transport: T,
    subscriptions: SubscriptionRegistry,
    callbacks: CallbackRegistry,
    subscription_endpoint: String,
    closed: bool,
}

impl Communicator<ZmqTransport> {
    /// Connect to Pupil Remote over ZMQ
    ///
    /// Fails fast when the command socket does not connect or the `SUB_PORT`
    /// handshake fails. The configured connect timeout bounds both the
    /// connection and the handshake reply. Nothing is retried here; see
    /// [`crate::retry_with_backoff`].
    pub fn connect(config: &CommunicatorConfig) -> Result<Self> {
        config.validate()?;
        let request_endpoint = config.request_endpoint();
        info!("[COMM] Connecting to Pupil Remote: {}", request_endpoint);

        let context = zmq::Context::new();
        let transport = ZmqTransport::connect(
            &context,
            &request_endpoint,
            config.block_until_connected,
            config.connect_timeout(),
        )?;
        Self::with_transport(transport, &config.address)
    }
}

impl<T: Transport> Communicator<T> {
    /// Build a communicator on an already connected command channel
    ///
    /// Performs the `SUB_PORT` handshake and connects both subscription
    /// channels to `<address>:<port>`. The transport is closed if the
    /// handshake fails.
    pub fn with_transport(mut transport: T, address: &str) -> Result<Self> {
        let subscription_endpoint = match Self::handshake(&mut transport, address) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                transport.close();
                return Err(e);
            }
        };
        info!("[COMM] ✓ Subscribed channels connected to {}", subscription_endpoint);

        Ok(Self {
            transport,
            subscriptions: SubscriptionRegistry::new(),
            callbacks: CallbackRegistry::new(),
            subscription_endpoint,
            closed: false,
        })
    }

    fn handshake(transport: &mut T, address: &str) -> Result<String> {
        let reply = transport.send_command(SUB_PORT_COMMAND)?;
        let port: u16 = reply.trim().parse().map_err(|_| {
            RemoteError::InvalidReply(format!("{} returned '{}'", SUB_PORT_COMMAND, reply))
        })?;
        let endpoint = format!("{}:{}", address, port);
        transport.connect_subscribers(&endpoint)?;
        // Later commands block until answered
        transport.set_reply_timeout(None)?;
        Ok(endpoint)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(RemoteError::Closed)
        } else {
            Ok(())
        }
    }

    /// Send a raw command and return the reply
    pub fn send_command(&mut self, command: &str) -> Result<String> {
        self.ensure_open()?;
        let reply = self.transport.send_command(command)?;
        debug!("[COMM] {} -> {}", command, reply);
        Ok(reply)
    }

    /// Send a notification to Pupil Remote
    ///
    /// The notification must carry a string `subject`; it is published on
    /// `notify.<subject>`. Returns the remote's acknowledgement.
    pub fn notify(&mut self, notification: &Payload) -> Result<String> {
        self.ensure_open()?;
        let subject = match notification.get("subject") {
            Some(Value::String(subject)) => subject,
            Some(_) => {
                return Err(RemoteError::InvalidNotification(
                    "subject must be a string".to_string(),
                ))
            }
            None => {
                return Err(RemoteError::InvalidNotification(
                    "missing subject".to_string(),
                ))
            }
        };
        let topic = format!("{}.{}", NOTIFY_PREFIX, subject);
        let bytes = encode_payload(notification)?;
        let reply = self.transport.send_notification(&topic, &bytes)?;
        debug!("[COMM] Notified {} -> {}", topic, reply);
        Ok(reply)
    }

    /// Start a recording, optionally naming the session
    pub fn start_recording(&mut self, session_name: Option<&str>) -> Result<String> {
        match session_name {
            Some(name) if !name.is_empty() => self.send_command(&format!("R {}", name)),
            _ => self.send_command("R"),
        }
    }

    pub fn stop_recording(&mut self) -> Result<String> {
        self.send_command("r")
    }

    pub fn start_calibration(&mut self) -> Result<String> {
        self.send_command("C")
    }

    pub fn stop_calibration(&mut self) -> Result<String> {
        self.send_command("c")
    }

    /// Add an explicit subscription
    ///
    /// Topics starting with `notify` go to the notification channel, all
    /// others to the data channel. Returns false if already subscribed.
    pub fn subscribe(&mut self, topic: &str) -> Result<bool> {
        self.ensure_open()?;
        self.subscriptions.subscribe(&mut self.transport, topic)
    }

    /// Remove an explicit subscription; unknown topics are ignored
    pub fn unsubscribe(&mut self, topic: &str) -> Result<bool> {
        self.ensure_open()?;
        self.subscriptions.unsubscribe(&mut self.transport, topic)
    }

    /// Poll both channels once and run the callbacks on what arrived
    ///
    /// Waits up to `timeout` (forever if `None`).
    pub fn poll_once(&mut self, timeout: Option<Duration>) -> Result<EventSet> {
        self.ensure_open()?;
        let events = poller::poll_once(&mut self.transport, timeout)?;
        self.callbacks.dispatch(&events)?;
        Ok(events)
    }

    /// Receive everything already queued without blocking
    ///
    /// Each event name maps to its most recent payload. Callbacks run once
    /// on the merged set.
    pub fn check_all_available(&mut self) -> Result<EventSet> {
        self.ensure_open()?;
        let events = poller::drain_available(&mut self.transport)?;
        self.callbacks.dispatch(&events)?;
        Ok(events)
    }

    /// Block until any of `looking_for` arrives or `timeout` runs out
    pub fn wait_any(&mut self, looking_for: &[&str], timeout: Option<Duration>) -> Result<EventSet> {
        self.wait(WaitMode::Any, looking_for, timeout)
    }

    /// Block until all of `looking_for` arrived or `timeout` runs out
    pub fn wait_all(&mut self, looking_for: &[&str], timeout: Option<Duration>) -> Result<EventSet> {
        self.wait(WaitMode::All, looking_for, timeout)
    }

    fn wait(&mut self, mode: WaitMode, looking_for: &[&str], timeout: Option<Duration>) -> Result<EventSet> {
        self.ensure_open()?;
        debug!("[COMM] Waiting ({:?}) for {:?}, timeout {:?}", mode, looking_for, timeout);
        wait_for_events(
            &mut self.transport,
            &mut self.subscriptions,
            &self.callbacks,
            mode,
            looking_for,
            timeout,
        )
    }

    /// Bind `callback` to every topic in `topics`
    ///
    /// The first callback of a topic subscribes to it. A topic whose
    /// subscription fails is left without the binding.
    pub fn add_callback(&mut self, callback: &Callback, topics: &[&str]) -> Result<()> {
        self.ensure_open()?;
        for topic in topics {
            if !self.callbacks.is_registered(topic) {
                self.subscriptions.subscribe(&mut self.transport, topic)?;
            }
            self.callbacks.add(topic, callback.clone());
        }
        Ok(())
    }

    /// Unbind `callback` from every topic in `topics`
    ///
    /// Removing the last callback of a topic drops its subscription. Topics
    /// without callbacks are logged and skipped.
    pub fn remove_callback(&mut self, callback: &Callback, topics: &[&str]) -> Result<()> {
        self.ensure_open()?;
        for topic in topics {
            if self.callbacks.remove(topic, callback) == Removal::TopicEmptied {
                self.subscriptions.unsubscribe(&mut self.transport, topic)?;
            }
        }
        Ok(())
    }

    /// Endpoint the subscription channels are connected to
    pub fn subscription_endpoint(&self) -> &str {
        &self.subscription_endpoint
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close all channels; later calls do nothing
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if !self.subscriptions.is_empty() {
            debug!(
                "[COMM] Closing with {} active subscriptions",
                self.subscriptions.len()
            );
        }
        self.transport.close();
        info!("[COMM] Connection to {} closed", self.subscription_endpoint);
    }
}

impl<T: Transport> Drop for Communicator<T> {
    fn drop(&mut self) {
        self.close();
    }
}
