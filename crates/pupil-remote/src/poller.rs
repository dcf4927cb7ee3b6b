// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Single-scan polling across both subscription channels

use crate::codec::stamp_arrival;
use crate::error::Result;
use crate::events::EventSet;
use crate::transport::{Channel, Transport};
use std::time::Duration;
use tracing::trace;

/// Poll both subscription sockets once
///
/// Blocks up to `timeout` (forever if `None`, not at all for zero) and then
/// receives exactly one message from every ready socket. The control channel
/// is read before the bulk channel, so if both deliver the same event name
/// the bulk payload is the one kept.
pub fn poll_once<T: Transport + ?Sized>(
    transport: &mut T,
    timeout: Option<Duration>,
) -> Result<EventSet> {
    let mut events = EventSet::new();
    let readiness = transport.poll(timeout)?;

    for channel in Channel::POLL_ORDER {
        if !readiness.is_ready(channel) {
            continue;
        }
        let (event, mut payload) = transport.recv(channel)?;
        stamp_arrival(&mut payload);
        trace!("[POLL] {:?} delivered {}", channel, event);
        events.insert(event, payload);
    }

    Ok(events)
}

/// Non-blocking polls until one comes back empty, merged in arrival order
pub fn drain_available<T: Transport + ?Sized>(transport: &mut T) -> Result<EventSet> {
    let mut events = EventSet::new();
    loop {
        let found = poll_once(transport, Some(Duration::ZERO))?;
        if found.is_empty() {
            return Ok(events);
        }
        events.merge(found);
    }
}
