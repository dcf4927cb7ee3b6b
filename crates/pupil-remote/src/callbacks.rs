// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Callback registry
//!
//! Handlers are bound to topics and run synchronously after every poll or
//! wait call with the events collected by that call. Topics are visited in
//! registration order and handlers within a topic in the order they were
//! added. The first handler error stops the dispatch and is returned to the
//! caller of the poll or wait.

use crate::codec::Payload;
use crate::error::{HandlerError, RemoteError, Result};
use crate::events::EventSet;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// Return type of a callback handler
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Shared handle to an event handler
///
/// Clones refer to the same handler. Removal compares handles by identity,
/// so two distinct closures with identical behaviour are never confused.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&str, &Payload) -> HandlerResult>);

impl Callback {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &Payload) -> HandlerResult + 'static,
    {
        Self(Rc::new(handler))
    }

    /// True if both handles point at the same handler
    pub fn same_as(&self, other: &Callback) -> bool {
        Rc::as_ptr(&self.0) as *const u8 == Rc::as_ptr(&other.0) as *const u8
    }

    pub fn call(&self, event: &str, payload: &Payload) -> HandlerResult {
        (self.0)(event, payload)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0) as *const u8)
    }
}

/// Outcome of adding a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First handler for the topic; the topic needs a subscription
    NewTopic,
    /// Appended to an existing topic
    Appended,
}

/// Outcome of removing a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Last handler removed; the topic's subscription must be dropped
    TopicEmptied,
    /// Handler removed, others remain for the topic
    Removed,
    /// Topic is known but the handler was not bound to it
    HandlerNotBound,
    /// Topic has no handlers at all
    UnknownTopic,
}

/// Ordered topic -> handlers bindings
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    bindings: Vec<(String, Vec<Callback>)>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, topic: &str, callback: Callback) -> Registration {
        match self.bindings.iter_mut().find(|(t, _)| t == topic) {
            Some((_, handlers)) => {
                handlers.push(callback);
                Registration::Appended
            }
            None => {
                self.bindings.push((topic.to_string(), vec![callback]));
                debug!("[CALLBACKS] First handler for topic: {}", topic);
                Registration::NewTopic
            }
        }
    }

    /// Remove every binding of `callback` to `topic`
    pub fn remove(&mut self, topic: &str, callback: &Callback) -> Removal {
        let Some(index) = self.bindings.iter().position(|(t, _)| t == topic) else {
            warn!("[CALLBACKS] ⚠ No handlers registered for topic: {}", topic);
            return Removal::UnknownTopic;
        };

        let handlers = &mut self.bindings[index].1;
        let before = handlers.len();
        handlers.retain(|h| !h.same_as(callback));

        if handlers.len() == before {
            warn!("[CALLBACKS] ⚠ Handler not bound to topic: {}", topic);
            Removal::HandlerNotBound
        } else if handlers.is_empty() {
            self.bindings.remove(index);
            debug!("[CALLBACKS] Last handler removed for topic: {}", topic);
            Removal::TopicEmptied
        } else {
            Removal::Removed
        }
    }

    pub fn is_registered(&self, topic: &str) -> bool {
        self.bindings.iter().any(|(t, _)| t == topic)
    }

    /// Topics in registration order
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(t, _)| t.as_str())
    }

    pub fn handler_count(&self, topic: &str) -> usize {
        self.bindings
            .iter()
            .find(|(t, _)| t == topic)
            .map(|(_, handlers)| handlers.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Invoke every handler whose topic matches an event in `events`
    pub fn dispatch(&self, events: &EventSet) -> Result<()> {
        for (topic, handlers) in &self.bindings {
            for (event, payload) in events.under_topic(topic) {
                for handler in handlers {
                    handler
                        .call(event, payload)
                        .map_err(|source| RemoteError::Callback {
                            event: event.to_string(),
                            source,
                        })?;
                }
            }
        }
        Ok(())
    }
}
