use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Timestamp used when the runtime did not say when an event happened.
pub const UNKNOWN_TIME: u64 = u64::MAX;

/// A runtime lifecycle event as received on the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub category: String,
    pub action: String,
    pub actor_id: String,
    /// `None` when `Actor` or `Actor.Attributes` is missing or not an object.
    pub attributes: Option<BTreeMap<String, String>>,
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON")]
    InvalidJson,
    #[error("JSON is null")]
    Null,
    #[error("payload is not an event object: {0}")]
    NotAnObject(String),
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(rename = "Type", default, deserialize_with = "lenient_string")]
    kind: String,
    #[serde(rename = "Action", default, deserialize_with = "lenient_string")]
    action: String,
    #[serde(default, deserialize_with = "lenient_string")]
    status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    id: String,
    #[serde(rename = "Actor", default)]
    actor: Value,
    #[serde(default)]
    time: Value,
}

impl RawEvent {
    /// Decode a parsed stream payload.
    ///
    /// Missing or oddly typed fields degrade to empty values; only a null or
    /// non-object payload is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the payload cannot describe an event.
    pub fn from_value(value: &Value) -> std::result::Result<Self, DecodeError> {
        match value {
            Value::Null => return Err(DecodeError::Null),
            Value::Object(_) => {}
            other => return Err(DecodeError::NotAnObject(json_kind(other).to_string())),
        }
        let wire =
            WireEvent::deserialize(value).map_err(|err| DecodeError::NotAnObject(err.to_string()))?;
        Ok(Self::from(wire))
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .as_ref()
            .and_then(|attrs| attrs.get(key))
            .map(String::as_str)
    }

    pub fn image(&self) -> Option<&str> {
        self.attribute("image")
    }

    pub fn name(&self) -> Option<&str> {
        self.attribute("name")
    }

    pub fn timestamp_or_unknown(&self) -> u64 {
        self.timestamp.unwrap_or(UNKNOWN_TIME)
    }
}

impl From<WireEvent> for RawEvent {
    fn from(wire: WireEvent) -> Self {
        let action = if wire.action.is_empty() {
            wire.status
        } else {
            wire.action
        };
        let attributes = wire
            .actor
            .as_object()
            .and_then(|actor| actor.get("Attributes"))
            .and_then(Value::as_object)
            .map(|attrs| {
                attrs
                    .iter()
                    .filter_map(|(key, value)| scalar_string(value).map(|v| (key.clone(), v)))
                    .collect()
            });
        Self {
            category: wire.kind,
            action,
            actor_id: wire.id,
            attributes,
            timestamp: epoch_seconds(&wire.time),
        }
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn lenient_string<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn epoch_seconds(value: &Value) -> Option<u64> {
    if let Some(secs) = value.as_u64() {
        return Some(secs);
    }
    let secs = value.as_f64()?;
    (secs >= 0.0 && secs.fract() == 0.0 && secs <= u64::MAX as f64).then(|| secs as u64)
}
