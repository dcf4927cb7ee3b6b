// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Msgpack payload encoding
//!
//! Pupil applications exchange msgpack maps. In memory they are kept as
//! `serde_json` maps so callers can index them without knowing the schema.

use crate::error::Result;
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Decoded message payload
pub type Payload = Map<String, Value>;

/// Field added to every received payload
pub const TIME_OF_ARRIVAL_KEY: &str = "_time_of_arrival_";

/// Serialize a payload as a msgpack map with string keys
pub fn encode_payload(payload: &Payload) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(payload)?)
}

/// Decode a msgpack map
pub fn decode_payload(bytes: &[u8]) -> Result<Payload> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Stamp `payload` with the current wall-clock time in seconds
pub fn stamp_arrival(payload: &mut Payload) {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    payload.insert(TIME_OF_ARRIVAL_KEY.to_string(), Value::from(now));
}
