// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Subscription bookkeeping
//!
//! Every subscribe and unsubscribe goes through this registry so the socket
//! state always mirrors what the registry believes is active.

use crate::error::Result;
use crate::topic;
use crate::transport::{Channel, Transport};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// How long a subscription lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permanence {
    /// Requested by the caller, lives until explicitly removed
    Explicit,
    /// Created by a wait call and removed when that call returns
    Temporary,
}

/// Active subscriptions keyed by topic
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    active: BTreeMap<String, Permanence>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permanence(&self, topic: &str) -> Option<Permanence> {
        self.active.get(topic).copied()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn topics(&self) -> impl Iterator<Item = (&str, Permanence)> {
        self.active.iter().map(|(t, p)| (t.as_str(), *p))
    }

    /// True if events named `name` are already delivered by some subscription
    pub fn covers(&self, name: &str) -> bool {
        self.active.keys().any(|t| topic::matches(t, name))
    }

    /// Add an explicit subscription
    ///
    /// Returns false when the topic was already explicitly subscribed. A
    /// temporary entry is promoted without touching the socket.
    pub fn subscribe<T: Transport + ?Sized>(&mut self, transport: &mut T, topic: &str) -> Result<bool> {
        match self.permanence(topic) {
            Some(Permanence::Explicit) => Ok(false),
            Some(Permanence::Temporary) => {
                self.active.insert(topic.to_string(), Permanence::Explicit);
                debug!("[SUBS] Promoted temporary subscription: {}", topic);
                Ok(true)
            }
            None => {
                transport.subscribe(Channel::for_topic(topic), topic)?;
                self.active.insert(topic.to_string(), Permanence::Explicit);
                debug!("[SUBS] Subscribed: {} ({:?})", topic, Channel::for_topic(topic));
                Ok(true)
            }
        }
    }

    /// Remove an explicit subscription
    ///
    /// Unknown topics are logged and ignored; the return value says whether
    /// anything was removed.
    pub fn unsubscribe<T: Transport + ?Sized>(&mut self, transport: &mut T, topic: &str) -> Result<bool> {
        match self.permanence(topic) {
            Some(Permanence::Explicit) => {
                transport.unsubscribe(Channel::for_topic(topic), topic)?;
                self.active.remove(topic);
                debug!("[SUBS] Unsubscribed: {}", topic);
                Ok(true)
            }
            _ => {
                warn!("[SUBS] ⚠ Unsubscribe for unknown topic ignored: {}", topic);
                Ok(false)
            }
        }
    }

    /// Subscribe to `topic` for the duration of one wait call
    ///
    /// Nothing happens if the topic is already covered. Returns true if a
    /// temporary subscription was created and must later be released.
    pub fn subscribe_temporary<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        topic: &str,
    ) -> Result<bool> {
        if self.covers(topic) {
            return Ok(false);
        }
        transport.subscribe(Channel::for_topic(topic), topic)?;
        self.active.insert(topic.to_string(), Permanence::Temporary);
        debug!("[SUBS] Temporary subscription: {}", topic);
        Ok(true)
    }

    /// Release a temporary subscription
    ///
    /// Entries promoted to explicit in the meantime stay active.
    pub fn release_temporary<T: Transport + ?Sized>(&mut self, transport: &mut T, topic: &str) -> Result<()> {
        if self.permanence(topic) == Some(Permanence::Temporary) {
            self.active.remove(topic);
            transport.unsubscribe(Channel::for_topic(topic), topic)?;
            debug!("[SUBS] Released temporary subscription: {}", topic);
        }
        Ok(())
    }
}
