// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Topic matching
//!
//! A *topic* is a subscription scope such as `notify.` and an *event* is the
//! concrete name of a received message such as `notify.calibration.successful`.
//! Everything in this crate uses one rule: an event matches a topic when the
//! event starts with the topic as a literal, case-sensitive prefix.

/// Returns true if `event` falls under `topic`
#[inline]
pub fn matches(topic: &str, event: &str) -> bool {
    event.starts_with(topic)
}

/// Returns all elements of `events` that start with `topic`
pub fn events_under_topic<'a, I, S>(events: I, topic: &str) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    events
        .into_iter()
        .map(|event: &'a S| event.as_ref())
        .filter(|event| matches(topic, event))
        .collect()
}

/// Returns all elements of `topics` that `event` starts with
pub fn topics_matching_event<'a, I, S>(topics: I, event: &str) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    topics
        .into_iter()
        .map(|topic: &'a S| topic.as_ref())
        .filter(|topic| matches(topic, event))
        .collect()
}
