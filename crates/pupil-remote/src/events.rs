// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Event sets returned by poll and wait calls

use crate::codec::Payload;
use crate::topic;
use std::collections::btree_map::{self, BTreeMap};

/// Most recent payload per event name, scoped to one poll or wait call
///
/// A newer arrival of the same event name replaces the older payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventSet {
    events: BTreeMap<String, Payload>,
}

impl EventSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, event: impl Into<String>, payload: Payload) {
        self.events.insert(event.into(), payload);
    }

    /// Merge `other` into `self`, keeping the newer payloads
    pub fn merge(&mut self, other: EventSet) {
        self.events.extend(other.events);
    }

    pub fn get(&self, event: &str) -> Option<&Payload> {
        self.events.get(event)
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events.contains_key(event)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Payload> {
        self.events.iter()
    }

    /// Events falling under `topic`
    pub fn under_topic<'a>(&'a self, topic: &'a str) -> impl Iterator<Item = (&'a str, &'a Payload)> {
        self.events
            .iter()
            .filter(move |(event, _)| topic::matches(topic, event))
            .map(|(event, payload)| (event.as_str(), payload))
    }

    /// Awaited names that no event in this set satisfies
    pub fn unmatched<'a, S: AsRef<str>>(&self, names: &'a [S]) -> Vec<&'a str> {
        names
            .iter()
            .map(|name: &'a S| -> &'a str { name.as_ref() })
            .filter(|name| !self.names().any(|event| topic::matches(name, event)))
            .collect()
    }
}

impl IntoIterator for EventSet {
    type Item = (String, Payload);
    type IntoIter = btree_map::IntoIter<String, Payload>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a EventSet {
    type Item = (&'a String, &'a Payload);
    type IntoIter = btree_map::Iter<'a, String, Payload>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
