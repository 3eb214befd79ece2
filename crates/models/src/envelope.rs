//! Two-stage decode of an upstream response.
//!
//! The body is first parsed as a generic JSON document, then the envelope
//! `{"success": 1, "results": [[<event>, ...], ...]}` is validated and each
//! event is projected into a [`MatchRecord`]. Envelope violations reject the
//! whole response; individual events that do not qualify are dropped.

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::error::{EnvelopeError, Result};
use crate::record::MatchRecord;

/// Decodes and filters one upstream response body into an ordered batch.
///
/// An envelope with zero qualifying events yields `Ok(vec![])`, which is a
/// valid batch and not an abstention.
pub fn decode_batch(body: &[u8], source: &str, ingested_at: NaiveDateTime) -> Result<Vec<MatchRecord>> {
    let document: Value = serde_json::from_slice(body)?;
    let events = event_list(&document)?;

    Ok(events
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|event| MatchRecord::from_event(event, source, ingested_at))
        .collect())
}

/// Validates the envelope and returns `results[0]`.
pub fn event_list(document: &Value) -> Result<&[Value]> {
    let envelope = document.as_object().ok_or(EnvelopeError::NotAnObject)?;

    match envelope.get("success") {
        Some(success) if success.as_f64() == Some(1.0) => {}
        other => {
            return Err(EnvelopeError::UnsuccessfulResponse {
                got: other.map_or_else(|| "nothing".to_string(), Value::to_string),
            })
        }
    }

    let results = envelope
        .get("results")
        .and_then(Value::as_array)
        .ok_or(EnvelopeError::MissingResults)?;

    let first = results.first().ok_or(EnvelopeError::EmptyResults)?;

    first
        .as_array()
        .map(Vec::as_slice)
        .ok_or(EnvelopeError::MalformedEventList)
}
