// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-process transport
//!
//! Behaves like a Pupil Remote session without any sockets: commands get
//! scripted replies, published messages go through the msgpack codec and
//! reach both subscription channels, each delivering only what its own
//! subscriptions match.
//! Every call is recorded so tests can assert on side effects.

use super::{Channel, Readiness, Transport};
use crate::codec::{decode_payload, encode_payload, Payload};
use crate::error::{RemoteError, Result};
use crate::topic;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Reply to every notification
pub const NOTIFICATION_ACK: &str = "Notification received";

/// Reply to commands without a scripted reply
pub const DEFAULT_COMMAND_REPLY: &str = "OK";

/// Default publish port returned for `SUB_PORT`
pub const DEFAULT_SUB_PORT: u16 = 50021;

/// A subscription change observed by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionCall {
    Subscribe(Channel, String),
    Unsubscribe(Channel, String),
}

/// Deterministic transport for tests and offline use
#[derive(Debug)]
pub struct InMemoryTransport {
    sub_port: u16,
    replies: HashMap<String, VecDeque<String>>,
    commands: Vec<String>,
    notifications: Vec<(String, Payload)>,
    subscriber_endpoint: Option<String>,
    active: HashMap<Channel, Vec<String>>,
    subscription_log: Vec<SubscriptionCall>,
    queues: HashMap<Channel, VecDeque<(String, Vec<u8>)>>,
    poll_count: usize,
    closed: bool,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            sub_port: DEFAULT_SUB_PORT,
            replies: HashMap::new(),
            commands: Vec::new(),
            notifications: Vec::new(),
            subscriber_endpoint: None,
            active: HashMap::new(),
            subscription_log: Vec::new(),
            queues: HashMap::new(),
            poll_count: 0,
            closed: false,
        }
    }

    /// Port reported for `SUB_PORT`
    pub fn with_sub_port(mut self, port: u16) -> Self {
        self.sub_port = port;
        self
    }

    /// Queue a reply for the next `command` sent
    pub fn script_reply(&mut self, command: impl Into<String>, reply: impl Into<String>) {
        self.replies
            .entry(command.into())
            .or_default()
            .push_back(reply.into());
    }

    /// Publish a message to both channels, as one PUB socket does to two SUBs
    pub fn publish(&mut self, topic: impl Into<String>, payload: &Payload) -> Result<()> {
        let topic = topic.into();
        let bytes = encode_payload(payload)?;
        for channel in Channel::POLL_ORDER {
            self.queues
                .entry(channel)
                .or_default()
                .push_back((topic.clone(), bytes.clone()));
        }
        Ok(())
    }

    /// Commands in the order they were sent
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Notifications in the order they were sent, decoded
    pub fn notifications(&self) -> &[(String, Payload)] {
        &self.notifications
    }

    pub fn subscriber_endpoint(&self) -> Option<&str> {
        self.subscriber_endpoint.as_deref()
    }

    /// Every subscribe/unsubscribe call in order
    pub fn subscription_log(&self) -> &[SubscriptionCall] {
        &self.subscription_log
    }

    /// Number of subscribe or unsubscribe calls made for `topic`
    pub fn subscription_calls(&self, topic: &str) -> (usize, usize) {
        self.subscription_log
            .iter()
            .fold((0, 0), |(subs, unsubs), call| match call {
                SubscriptionCall::Subscribe(_, t) if t == topic => (subs + 1, unsubs),
                SubscriptionCall::Unsubscribe(_, t) if t == topic => (subs, unsubs + 1),
                _ => (subs, unsubs),
            })
    }

    /// Topics currently subscribed on a channel
    pub fn active_subscriptions(&self, channel: Channel) -> &[String] {
        self.active.get(&channel).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn active_subscription_count(&self) -> usize {
        self.active.values().map(Vec::len).sum()
    }

    /// Messages still queued on a channel
    pub fn pending(&self, channel: Channel) -> usize {
        self.queues.get(&channel).map(VecDeque::len).unwrap_or(0)
    }

    pub fn poll_count(&self) -> usize {
        self.poll_count
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(RemoteError::Closed)
        } else {
            Ok(())
        }
    }

    fn is_subscribed(&self, channel: Channel, event: &str) -> bool {
        self.active_subscriptions(channel)
            .iter()
            .any(|t| topic::matches(t, event))
    }

    /// Drop messages nobody subscribes to, as a SUB socket would
    fn filter_queue(&mut self, channel: Channel) -> bool {
        let subscribed: Vec<String> = self.active_subscriptions(channel).to_vec();
        match self.queues.get_mut(&channel) {
            Some(queue) => {
                queue.retain(|(event, _)| subscribed.iter().any(|t| topic::matches(t, event)));
                !queue.is_empty()
            }
            None => false,
        }
    }
}

impl Transport for InMemoryTransport {
    fn send_command(&mut self, command: &str) -> Result<String> {
        self.ensure_open()?;
        self.commands.push(command.to_string());

        if let Some(reply) = self.replies.get_mut(command).and_then(VecDeque::pop_front) {
            return Ok(reply);
        }
        if command == "SUB_PORT" {
            return Ok(self.sub_port.to_string());
        }
        Ok(DEFAULT_COMMAND_REPLY.to_string())
    }

    fn send_notification(&mut self, topic: &str, payload: &[u8]) -> Result<String> {
        self.ensure_open()?;
        self.notifications
            .push((topic.to_string(), decode_payload(payload)?));
        Ok(NOTIFICATION_ACK.to_string())
    }

    fn connect_subscribers(&mut self, endpoint: &str) -> Result<()> {
        self.ensure_open()?;
        self.subscriber_endpoint = Some(endpoint.to_string());
        Ok(())
    }

    fn subscribe(&mut self, channel: Channel, topic: &str) -> Result<()> {
        self.ensure_open()?;
        self.active.entry(channel).or_default().push(topic.to_string());
        self.subscription_log
            .push(SubscriptionCall::Subscribe(channel, topic.to_string()));
        Ok(())
    }

    fn unsubscribe(&mut self, channel: Channel, topic: &str) -> Result<()> {
        self.ensure_open()?;
        if let Some(topics) = self.active.get_mut(&channel) {
            // One unsubscribe cancels one subscribe, like ZMQ
            if let Some(pos) = topics.iter().position(|t| t == topic) {
                topics.remove(pos);
            }
        }
        self.subscription_log
            .push(SubscriptionCall::Unsubscribe(channel, topic.to_string()));
        Ok(())
    }

    fn poll(&mut self, timeout: Option<Duration>) -> Result<Readiness> {
        self.ensure_open()?;
        self.poll_count += 1;

        let readiness = Readiness {
            control: self.filter_queue(Channel::Control),
            bulk: self.filter_queue(Channel::Bulk),
        };

        if !readiness.any() {
            match timeout {
                Some(timeout) if !timeout.is_zero() => std::thread::sleep(timeout),
                Some(_) => {}
                None => {
                    return Err(RemoteError::Other(
                        "unbounded poll with no message queued would never return".to_string(),
                    ))
                }
            }
        }
        Ok(readiness)
    }

    fn recv(&mut self, channel: Channel) -> Result<(String, Payload)> {
        self.ensure_open()?;
        let (event, bytes) = self
            .queues
            .get_mut(&channel)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| RemoteError::Other(format!("nothing queued on {:?}", channel)))?;

        if !self.is_subscribed(channel, &event) {
            return Err(RemoteError::MalformedMessage(format!(
                "received '{}' without a matching subscription",
                event
            )));
        }
        Ok((event, decode_payload(&bytes)?))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_only_subscribed_messages_are_delivered() {
        let mut transport = InMemoryTransport::new();
        transport.subscribe(Channel::Bulk, "pupil").unwrap();
        transport.publish("gaze.0", &payload(json!({"x": 1}))).unwrap();
        transport.publish("pupil.0", &payload(json!({"x": 2}))).unwrap();

        let ready = transport.poll(Some(Duration::ZERO)).unwrap();
        assert_eq!(ready, Readiness { control: false, bulk: true });
        assert_eq!(transport.pending(Channel::Bulk), 1);

        let (topic, data) = transport.recv(Channel::Bulk).unwrap();
        assert_eq!(topic, "pupil.0");
        assert_eq!(data["x"], json!(2));
    }

    #[test]
    fn test_notification_delivered_through_bulk_subscription() {
        let mut transport = InMemoryTransport::new();
        transport.subscribe(Channel::Bulk, "noti").unwrap();
        transport
            .publish("notify.recording.started", &payload(json!({"n": 1})))
            .unwrap();

        let ready = transport.poll(Some(Duration::ZERO)).unwrap();
        assert_eq!(ready, Readiness { control: false, bulk: true });
        let (topic, _) = transport.recv(Channel::Bulk).unwrap();
        assert_eq!(topic, "notify.recording.started");
        assert_eq!(transport.pending(Channel::Control), 0);
    }

    #[test]
    fn test_matching_subscriptions_on_both_channels_deliver_twice() {
        let mut transport = InMemoryTransport::new();
        transport.subscribe(Channel::Control, "notify.").unwrap();
        transport.subscribe(Channel::Bulk, "").unwrap();
        transport.publish("notify.a", &payload(json!({"n": 1}))).unwrap();

        let ready = transport.poll(Some(Duration::ZERO)).unwrap();
        assert_eq!(ready, Readiness { control: true, bulk: true });
        assert_eq!(transport.recv(Channel::Control).unwrap().0, "notify.a");
        assert_eq!(transport.recv(Channel::Bulk).unwrap().0, "notify.a");
    }

    #[test]
    fn test_scripted_and_default_replies() {
        let mut transport = InMemoryTransport::new().with_sub_port(6000);
        transport.script_reply("v", "3.5.1");

        assert_eq!(transport.send_command("SUB_PORT").unwrap(), "6000");
        assert_eq!(transport.send_command("v").unwrap(), "3.5.1");
        assert_eq!(transport.send_command("v").unwrap(), DEFAULT_COMMAND_REPLY);
        assert_eq!(transport.commands(), ["SUB_PORT", "v", "v"]);
    }

    #[test]
    fn test_unbounded_poll_with_nothing_queued_fails() {
        let mut transport = InMemoryTransport::new();
        assert!(transport.poll(None).is_err());
    }

    #[test]
    fn test_unsubscribe_cancels_one_subscribe() {
        let mut transport = InMemoryTransport::new();
        transport.subscribe(Channel::Control, "notify.").unwrap();
        transport.subscribe(Channel::Control, "notify.").unwrap();
        transport.unsubscribe(Channel::Control, "notify.").unwrap();

        assert_eq!(transport.active_subscriptions(Channel::Control), ["notify."]);
        assert_eq!(transport.subscription_calls("notify."), (2, 1));
    }

    #[test]
    fn test_closed_transport_rejects_calls() {
        let mut transport = InMemoryTransport::new();
        transport.close();
        transport.close();
        assert!(transport.is_closed());
        assert!(matches!(transport.send_command("t"), Err(RemoteError::Closed)));
    }
}
