// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ZMQ implementation of the transport adapter

use super::{Channel, Readiness, Transport};
use crate::codec::{decode_payload, Payload};
use crate::error::{RemoteError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

static MONITOR_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Sockets for one connection to Pupil Remote
///
/// - **Commands**: ZMQ REQ socket
/// - **Notifications**: ZMQ SUB socket for `notify*` topics
/// - **Data**: ZMQ SUB socket for everything else
pub struct ZmqTransport {
    /// Command socket (ZMQ REQ)
    requester: Option<zmq::Socket>,

    /// Notification socket (ZMQ SUB)
    control: Option<zmq::Socket>,

    /// Data socket (ZMQ SUB)
    bulk: Option<zmq::Socket>,

    /// Declared last so every socket is closed before the context terminates
    _context: zmq::Context,
}

fn timeout_ms(timeout: Duration) -> i32 {
    i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX)
}

/// Name a timed out send or receive on the command socket
fn command_error(e: zmq::Error) -> RemoteError {
    match e {
        zmq::Error::EAGAIN => RemoteError::Timeout("no reply from Pupil Remote".to_string()),
        e => e.into(),
    }
}

impl ZmqTransport {
    /// Create all sockets and connect the command socket
    ///
    /// With `block_until_connected` the call only returns once the command
    /// socket reports a completed connection. Any monitor event other than
    /// a delayed connect is treated as a failure, and `connect_timeout`
    /// bounds the wait.
    ///
    /// `connect_timeout` also bounds every command until
    /// [`Transport::set_reply_timeout`] lifts it, so a peer that never
    /// answers the handshake fails with [`RemoteError::Timeout`].
    pub fn connect(
        context: &zmq::Context,
        request_endpoint: &str,
        block_until_connected: bool,
        connect_timeout: Option<Duration>,
    ) -> Result<Self> {
        let requester = context.socket(zmq::REQ)?;
        requester.set_linger(0)?;

        if block_until_connected {
            let monitor_endpoint = format!(
                "inproc://pupil-remote-monitor-{}",
                MONITOR_SEQ.fetch_add(1, Ordering::Relaxed)
            );
            Self::connect_monitored(
                context,
                &requester,
                request_endpoint,
                &monitor_endpoint,
                connect_timeout,
            )?;
        } else {
            requester.connect(request_endpoint)?;
        }
        debug!("[ZMQ] ✓ Command socket connected to {}", request_endpoint);

        let control = context.socket(zmq::SUB)?;
        control.set_linger(0)?;
        let bulk = context.socket(zmq::SUB)?;
        bulk.set_linger(0)?;

        let mut transport = Self {
            requester: Some(requester),
            control: Some(control),
            bulk: Some(bulk),
            _context: context.clone(),
        };
        transport.set_reply_timeout(connect_timeout)?;
        Ok(transport)
    }

    fn connect_monitored(
        context: &zmq::Context,
        socket: &zmq::Socket,
        endpoint: &str,
        monitor_endpoint: &str,
        connect_timeout: Option<Duration>,
    ) -> Result<()> {
        socket.monitor(monitor_endpoint, zmq::SocketEvent::ALL as i32)?;

        let monitor = context.socket(zmq::PAIR)?;
        monitor.set_linger(0)?;
        if let Some(timeout) = connect_timeout {
            monitor.set_rcvtimeo(timeout_ms(timeout))?;
        }
        monitor.connect(monitor_endpoint)?;

        socket.connect(endpoint)?;

        loop {
            let frame = match monitor.recv_bytes(0) {
                Ok(frame) => frame,
                Err(zmq::Error::EAGAIN) => {
                    return Err(RemoteError::Timeout(format!(
                        "no connection to {} within {:?}",
                        endpoint, connect_timeout
                    )));
                }
                Err(e) => return Err(e.into()),
            };
            // Second frame carries the affected address
            while monitor.get_rcvmore()? {
                monitor.recv_bytes(0)?;
            }

            if frame.len() < 2 {
                return Err(RemoteError::ConnectionFailed(
                    "truncated socket monitor event".to_string(),
                ));
            }
            let event = u16::from_le_bytes([frame[0], frame[1]]);

            if event == zmq::SocketEvent::CONNECTED.to_raw() {
                // Re-arming with no events replaces the monitor and stops reporting
                socket.monitor(&format!("{}-detached", monitor_endpoint), 0)?;
                return Ok(());
            } else if event == zmq::SocketEvent::CONNECT_DELAYED.to_raw() {
                debug!("[ZMQ] Connect to {} delayed, still waiting", endpoint);
            } else {
                warn!("[ZMQ] ✗ Connect to {} failed (monitor event {:#06x})", endpoint, event);
                return Err(RemoteError::ConnectionFailed(format!(
                    "socket monitor reported event {:#06x} for {}",
                    event, endpoint
                )));
            }
        }
    }

    fn requester(&self) -> Result<&zmq::Socket> {
        self.requester.as_ref().ok_or(RemoteError::Closed)
    }

    fn subscriber(&self, channel: Channel) -> Result<&zmq::Socket> {
        match channel {
            Channel::Control => self.control.as_ref(),
            Channel::Bulk => self.bulk.as_ref(),
        }
        .ok_or(RemoteError::Closed)
    }

    fn read_reply(socket: &zmq::Socket) -> Result<String> {
        socket.recv_string(0).map_err(command_error)?.map_err(|bytes| {
            RemoteError::InvalidReply(format!("{} bytes of non UTF-8 reply", bytes.len()))
        })
    }
}

impl Transport for ZmqTransport {
    fn send_command(&mut self, command: &str) -> Result<String> {
        let socket = self.requester()?;
        socket.send(command, 0).map_err(command_error)?;
        Self::read_reply(socket)
    }

    fn send_notification(&mut self, topic: &str, payload: &[u8]) -> Result<String> {
        let socket = self.requester()?;
        socket
            .send_multipart([topic.as_bytes(), payload], 0)
            .map_err(command_error)?;
        Self::read_reply(socket)
    }

    fn set_reply_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        let ms = timeout.map(timeout_ms).unwrap_or(-1);
        let socket = self.requester()?;
        socket.set_rcvtimeo(ms)?;
        socket.set_sndtimeo(ms)?;
        Ok(())
    }

    fn connect_subscribers(&mut self, endpoint: &str) -> Result<()> {
        for channel in Channel::POLL_ORDER {
            self.subscriber(channel)?.connect(endpoint)?;
        }
        debug!("[ZMQ] ✓ Subscription sockets connected to {}", endpoint);
        Ok(())
    }

    fn subscribe(&mut self, channel: Channel, topic: &str) -> Result<()> {
        self.subscriber(channel)?.set_subscribe(topic.as_bytes())?;
        Ok(())
    }

    fn unsubscribe(&mut self, channel: Channel, topic: &str) -> Result<()> {
        self.subscriber(channel)?.set_unsubscribe(topic.as_bytes())?;
        Ok(())
    }

    fn poll(&mut self, timeout: Option<Duration>) -> Result<Readiness> {
        let timeout_ms = match timeout {
            Some(timeout) => i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX),
            None => -1,
        };

        let control = self.subscriber(Channel::Control)?;
        let bulk = self.subscriber(Channel::Bulk)?;
        let mut items = [
            control.as_poll_item(zmq::POLLIN),
            bulk.as_poll_item(zmq::POLLIN),
        ];
        zmq::poll(&mut items, timeout_ms)?;

        Ok(Readiness {
            control: items[0].is_readable(),
            bulk: items[1].is_readable(),
        })
    }

    fn recv(&mut self, channel: Channel) -> Result<(String, Payload)> {
        let mut frames = self.subscriber(channel)?.recv_multipart(0)?.into_iter();

        let topic = frames
            .next()
            .map(|frame| String::from_utf8_lossy(&frame).into_owned())
            .ok_or_else(|| RemoteError::MalformedMessage("empty multipart message".to_string()))?;
        let payload = frames.next().ok_or_else(|| {
            RemoteError::MalformedMessage(format!("message '{}' has no payload frame", topic))
        })?;
        // Further frames (raw image buffers) are not part of the event payload

        Ok((topic, decode_payload(&payload)?))
    }

    fn close(&mut self) {
        if self.requester.is_none() && self.control.is_none() && self.bulk.is_none() {
            return;
        }
        self.requester = None;
        self.control = None;
        self.bulk = None;
        debug!("[ZMQ] Sockets closed");
    }
}

impl Drop for ZmqTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconnected_transport_lifecycle() {
        let context = zmq::Context::new();
        let mut transport =
            ZmqTransport::connect(&context, "tcp://127.0.0.1:50020", false, None).unwrap();

        transport.subscribe(Channel::Control, "notify.").unwrap();
        transport.unsubscribe(Channel::Control, "notify.").unwrap();
        let ready = transport.poll(Some(Duration::ZERO)).unwrap();
        assert!(!ready.any());

        transport.close();
        transport.close();
        assert!(matches!(
            transport.subscribe(Channel::Bulk, "pupil"),
            Err(RemoteError::Closed)
        ));
        assert!(matches!(transport.poll(Some(Duration::ZERO)), Err(RemoteError::Closed)));
    }

    #[test]
    fn test_reply_timeout_applies_until_lifted() {
        let context = zmq::Context::new();
        let mut transport = ZmqTransport::connect(
            &context,
            "tcp://127.0.0.1:50020",
            false,
            Some(Duration::from_millis(250)),
        )
        .unwrap();

        let requester = transport.requester().unwrap();
        assert_eq!(requester.get_rcvtimeo().unwrap(), 250);
        assert_eq!(requester.get_sndtimeo().unwrap(), 250);

        transport.set_reply_timeout(None).unwrap();
        let requester = transport.requester().unwrap();
        assert_eq!(requester.get_rcvtimeo().unwrap(), -1);
        assert_eq!(requester.get_sndtimeo().unwrap(), -1);
    }

    #[test]
    fn test_monitor_detached_after_connect() {
        let context = zmq::Context::new();
        let server = context.socket(zmq::REP).unwrap();
        server.set_linger(0).unwrap();
        server.bind("tcp://127.0.0.1:*").unwrap();
        let endpoint = server.get_last_endpoint().unwrap().unwrap();

        let requester = context.socket(zmq::REQ).unwrap();
        requester.set_linger(0).unwrap();
        ZmqTransport::connect_monitored(
            &context,
            &requester,
            &endpoint,
            "inproc://pupil-remote-test-monitor",
            Some(Duration::from_secs(5)),
        )
        .unwrap();

        let late_reader = context.socket(zmq::PAIR).unwrap();
        late_reader.set_linger(0).unwrap();
        late_reader.set_rcvtimeo(500).unwrap();
        late_reader
            .connect("inproc://pupil-remote-test-monitor")
            .unwrap();

        // Losing the peer raises an event on any monitor still attached
        drop(server);
        assert!(matches!(late_reader.recv_bytes(0), Err(zmq::Error::EAGAIN)));
    }

    #[test]
    fn test_receives_published_event() {
        let context = zmq::Context::new();
        let publisher = context.socket(zmq::PUB).unwrap();
        publisher.set_linger(0).unwrap();
        publisher.bind("inproc://pupil-remote-test-pub").unwrap();

        let mut transport =
            ZmqTransport::connect(&context, "inproc://pupil-remote-test-req", false, None)
                .unwrap();
        transport
            .connect_subscribers("inproc://pupil-remote-test-pub")
            .unwrap();
        transport.subscribe(Channel::Bulk, "pupil").unwrap();

        let payload = serde_json::json!({"confidence": 0.9}).as_object().cloned().unwrap();
        let bytes = crate::codec::encode_payload(&payload).unwrap();

        // Subscriptions propagate asynchronously; republish until one arrives
        let mut received = None;
        for _ in 0..100 {
            publisher
                .send_multipart([b"pupil.0".as_slice(), bytes.as_slice()], 0)
                .unwrap();
            if transport.poll(Some(Duration::from_millis(20))).unwrap().bulk {
                received = Some(transport.recv(Channel::Bulk).unwrap());
                break;
            }
        }

        let (topic, decoded) = received.expect("no event received");
        assert_eq!(topic, "pupil.0");
        assert_eq!(decoded, payload);
    }
}
