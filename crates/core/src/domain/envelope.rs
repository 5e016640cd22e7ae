// Event Envelope Domain Model

use crate::domain::RequestId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Async event channel an envelope is delivered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsyncChannel {
    System,
    Dialog,
    SaveLoad,
    Iap,
    Social,
}

impl std::fmt::Display for AsyncChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AsyncChannel::System => write!(f, "system"),
            AsyncChannel::Dialog => write!(f, "dialog"),
            AsyncChannel::SaveLoad => write!(f, "save_load"),
            AsyncChannel::Iap => write!(f, "iap"),
            AsyncChannel::Social => write!(f, "social"),
        }
    }
}

/// Keys that may carry the originating request id, in lookup order
const REQUEST_ID_KEYS: [&str; 3] = ["id", "async_id", "requestID"];

/// Discriminant carried by an envelope
#[derive(Debug, Clone, PartialEq)]
pub enum Discriminant {
    /// `type` field (dialog, iap)
    Type(String),
    /// `event_type` field (system)
    EventType(String),
    /// Numeric social message `id`, optionally refined by `event`
    Message { kind: i64, event: Option<String> },
    None,
}

/// Asynchronously delivered key-value payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub channel: AsyncChannel,
    pub fields: Map<String, Value>,
}

impl Envelope {
    pub fn new(channel: AsyncChannel) -> Self {
        Self {
            channel,
            fields: Map::new(),
        }
    }

    /// Builder-style field insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    /// Integer view of a numeric field (reals are truncated)
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        let value = self.fields.get(key)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
            .or_else(|| value.as_bool().map(i64::from))
    }

    /// Boolean view of a field; non-zero numbers count as true
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        let value = self.fields.get(key)?;
        value
            .as_bool()
            .or_else(|| value.as_f64().map(|f| f != 0.0))
    }

    /// The request id this envelope claims to answer, if any.
    ///
    /// On the social channel `id` is the message type, so only `requestID`
    /// is considered there.
    pub fn request_id(&self) -> Option<RequestId> {
        let keys: &[&str] = if self.channel == AsyncChannel::Social {
            &REQUEST_ID_KEYS[2..]
        } else {
            &REQUEST_ID_KEYS
        };

        keys.iter()
            .find_map(|key| self.get_i64(key))
            .and_then(RequestId::new)
    }

    pub fn discriminant(&self) -> Discriminant {
        match self.channel {
            AsyncChannel::Social => match self.get_i64("id") {
                Some(kind) => Discriminant::Message {
                    kind,
                    event: self.get_str("event").map(str::to_string),
                },
                None => Discriminant::None,
            },
            _ => {
                if let Some(t) = self.get_str("type") {
                    Discriminant::Type(t.to_string())
                } else if let Some(t) = self.get_str("event_type") {
                    Discriminant::EventType(t.to_string())
                } else {
                    Discriminant::None
                }
            }
        }
    }
}
