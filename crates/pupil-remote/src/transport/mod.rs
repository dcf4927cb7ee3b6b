// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transport adapter
//!
//! The communicator talks to the remote application through three sockets:
//! a request/reply command channel and two subscription channels. Control
//! notifications (topics starting with `notify`) arrive on one subscription
//! socket and everything else (typically high-rate data) on the other, so a
//! flood of data never delays a notification.

pub mod memory;
pub mod zmq_transport;

pub use memory::InMemoryTransport;
pub use zmq_transport::ZmqTransport;

use crate::codec::Payload;
use crate::error::Result;
use std::time::Duration;

/// Topic prefix routed to the control channel
pub const NOTIFY_PREFIX: &str = "notify";

/// Subscription channel a topic is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Control-plane notifications
    Control,
    /// Bulk data
    Bulk,
}

impl Channel {
    /// Route a topic by its prefix
    pub fn for_topic(topic: &str) -> Self {
        if topic.starts_with(NOTIFY_PREFIX) {
            Channel::Control
        } else {
            Channel::Bulk
        }
    }

    /// Channels in the order they are drained after a poll
    pub const POLL_ORDER: [Channel; 2] = [Channel::Control, Channel::Bulk];
}

/// Result of a single readiness poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub control: bool,
    pub bulk: bool,
}

impl Readiness {
    pub fn is_ready(&self, channel: Channel) -> bool {
        match channel {
            Channel::Control => self.control,
            Channel::Bulk => self.bulk,
        }
    }

    pub fn any(&self) -> bool {
        self.control || self.bulk
    }
}

/// Contract between the event engine and the sockets underneath it
///
/// Implementations are used from a single thread of control and need no
/// internal locking.
pub trait Transport {
    /// Send a command string and block for exactly one reply
    fn send_command(&mut self, command: &str) -> Result<String>;

    /// Send a two-part `(topic, payload)` request and block for the reply
    fn send_notification(&mut self, topic: &str, payload: &[u8]) -> Result<String>;

    /// Bound how long a command waits to be sent and answered
    ///
    /// `None` waits forever. Transports that never block ignore it.
    fn set_reply_timeout(&mut self, _timeout: Option<Duration>) -> Result<()> {
        Ok(())
    }

    /// Connect both subscription sockets to the session's publish endpoint
    fn connect_subscribers(&mut self, endpoint: &str) -> Result<()>;

    fn subscribe(&mut self, channel: Channel, topic: &str) -> Result<()>;

    fn unsubscribe(&mut self, channel: Channel, topic: &str) -> Result<()>;

    /// Wait for readiness on either subscription socket
    ///
    /// `None` blocks indefinitely, `Some(Duration::ZERO)` does not block.
    fn poll(&mut self, timeout: Option<Duration>) -> Result<Readiness>;

    /// Receive one `(topic, payload)` pair from a channel reported ready
    fn recv(&mut self, channel: Channel) -> Result<(String, Payload)>;

    /// Release all sockets. Calling it more than once is a no-op.
    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_routing() {
        assert_eq!(Channel::for_topic("notify.calibration.successful"), Channel::Control);
        assert_eq!(Channel::for_topic("notify"), Channel::Control);
        assert_eq!(Channel::for_topic("notifyx"), Channel::Control);
        assert_eq!(Channel::for_topic("pupil.0"), Channel::Bulk);
        assert_eq!(Channel::for_topic(""), Channel::Bulk);
        assert_eq!(Channel::for_topic("Notify.x"), Channel::Bulk);
    }

    #[test]
    fn test_readiness() {
        let ready = Readiness { control: false, bulk: true };
        assert!(ready.any());
        assert!(ready.is_ready(Channel::Bulk));
        assert!(!ready.is_ready(Channel::Control));
        assert!(!Readiness::default().any());
    }
}
