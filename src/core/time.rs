//! Wall-clock helpers for audit events and CLI envelopes.
//!
//! Registry records never read the wall clock; they store the logical `at` value carried by
//! the caller's context.

use serde_json::Value as JsonValue;
use ulid::Ulid;

pub fn now_epoch_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    format!("{}Z", now_epoch_secs())
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

const ENVELOPE_VERSION: &str = "1.0.0";

/// Wraps one registry command result for printing.
///
/// `cmd` is the dotted operation (`field.register`, `access.check`) and `status` is `ok`,
/// `not_found` for a lookup with no record, or `error`. The record fields in `body` sit at
/// the top level next to the header; a body key never replaces a header key.
pub fn command_envelope(cmd: &str, status: &str, body: JsonValue) -> JsonValue {
    let mut envelope = match body {
        JsonValue::Object(fields) => fields,
        _ => serde_json::Map::new(),
    };
    envelope.insert("envelope_version".into(), ENVELOPE_VERSION.into());
    envelope.insert("ts".into(), now_epoch_z().into());
    envelope.insert("event_id".into(), new_event_id().into());
    envelope.insert("cmd".into(), cmd.into());
    envelope.insert("status".into(), status.into());
    JsonValue::Object(envelope)
}
