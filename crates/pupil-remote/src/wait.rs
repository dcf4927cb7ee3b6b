// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Waiting for events
//!
//! A wait call repeatedly polls both subscription channels, accumulates what
//! arrives and stops once one (`WaitMode::Any`) or all (`WaitMode::All`) of
//! the awaited names have been seen, or when its timeout budget runs out.
//! Names that nothing currently delivers get a temporary subscription for the
//! duration of the call. Those are always released before returning, even
//! when polling fails.

use crate::callbacks::CallbackRegistry;
use crate::error::Result;
use crate::events::EventSet;
use crate::poller::poll_once;
use crate::subscriptions::SubscriptionRegistry;
use crate::topic;
use crate::transport::Transport;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Stop condition of a wait call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Return as soon as any awaited name was seen
    Any,
    /// Return once every awaited name was seen
    All,
}

/// Remaining time of a wait call
///
/// Elapsed time is measured on the monotonic clock between checkpoints and
/// subtracted from what is left, so the poll timeout shrinks with every
/// iteration.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutBudget {
    remaining: Option<Duration>,
    checkpoint: Instant,
}

impl TimeoutBudget {
    /// `None` means no limit
    pub fn new(timeout: Option<Duration>) -> Self {
        Self::starting_at(timeout, Instant::now())
    }

    pub fn starting_at(timeout: Option<Duration>, checkpoint: Instant) -> Self {
        Self {
            remaining: timeout,
            checkpoint,
        }
    }

    /// Timeout for the next poll
    pub fn remaining(&self) -> Option<Duration> {
        self.remaining
    }

    /// Charge the time passed since the last checkpoint
    ///
    /// Returns true once the budget is spent. An unlimited budget never is.
    pub fn charge(&mut self, now: Instant) -> bool {
        let Some(remaining) = self.remaining else {
            return false;
        };
        let elapsed = now.saturating_duration_since(self.checkpoint);
        self.checkpoint = now;
        let left = remaining.saturating_sub(elapsed);
        self.remaining = Some(left);
        left.is_zero()
    }
}

/// Awaited names not yet satisfied plus the sticky "found any" flag
#[derive(Debug)]
struct Pending {
    looking_for: Vec<String>,
    found_any: bool,
}

impl Pending {
    fn new(looking_for: Vec<String>) -> Self {
        Self {
            looking_for,
            found_any: false,
        }
    }

    /// Drop every awaited name satisfied by an event in `events`
    fn update(&mut self, events: &EventSet) {
        for event in events.names() {
            let before = self.looking_for.len();
            self.looking_for.retain(|name| !topic::matches(name, event));
            // once true always true
            self.found_any |= self.looking_for.len() < before;
        }
    }

    fn is_done(&self, mode: WaitMode) -> bool {
        self.looking_for.is_empty() || (mode == WaitMode::Any && self.found_any)
    }
}

/// Block until one or all of `looking_for` were encountered
///
/// Returns every event collected during the call, after running the
/// registered callbacks on them. A timeout is not an error: compare the
/// result against the awaited names (see [`EventSet::unmatched`]) to detect
/// partial success.
pub fn wait_for_events<T: Transport + ?Sized>(
    transport: &mut T,
    subscriptions: &mut SubscriptionRegistry,
    callbacks: &CallbackRegistry,
    mode: WaitMode,
    looking_for: &[&str],
    timeout: Option<Duration>,
) -> Result<EventSet> {
    let mut unique: Vec<String> = Vec::with_capacity(looking_for.len());
    for name in looking_for {
        if !unique.iter().any(|n| n.as_str() == *name) {
            unique.push(name.to_string());
        }
    }

    let mut temporary = Vec::new();
    let mut outcome = Ok(());
    for name in &unique {
        match subscriptions.subscribe_temporary(transport, name) {
            Ok(true) => temporary.push(name.clone()),
            Ok(false) => {}
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }

    let collected = outcome.and_then(|()| collect(transport, mode, Pending::new(unique), timeout));

    let mut release_error = None;
    for name in &temporary {
        if let Err(e) = subscriptions.release_temporary(transport, name) {
            warn!("[WAIT] ⚠ Failed to release temporary subscription {}: {}", name, e);
            release_error.get_or_insert(e);
        }
    }

    let events = collected?;
    if let Some(e) = release_error {
        return Err(e);
    }
    callbacks.dispatch(&events)?;
    Ok(events)
}

fn collect<T: Transport + ?Sized>(
    transport: &mut T,
    mode: WaitMode,
    mut pending: Pending,
    timeout: Option<Duration>,
) -> Result<EventSet> {
    let mut events = EventSet::new();
    if pending.is_done(mode) {
        return Ok(events);
    }

    let mut budget = TimeoutBudget::new(timeout);
    loop {
        let found = poll_once(transport, budget.remaining())?;
        events.merge(found);
        pending.update(&events);

        if pending.is_done(mode) {
            break;
        }
        if budget.charge(Instant::now()) {
            debug!("[WAIT] Timed out, still waiting for {:?}", pending.looking_for);
            break;
        }
    }
    Ok(events)
}
