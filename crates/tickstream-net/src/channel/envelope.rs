//! The `type`-discriminated JSON envelope carried on every channel.
//!
//! An envelope is a JSON object with a required string field `type`; every
//! other field is payload whose shape depends on the type and is opaque to
//! dispatch. Inbound text frames are classified with [`Inbound::classify`]
//! before they ever reach a handler.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{NetworkError, Result};

/// Name of the discriminator field.
pub const TYPE_FIELD: &str = "type";

/// A parsed channel message.
///
/// The full JSON object is kept, discriminator included, so handlers and
/// [`decode`](Self::decode) see exactly what the server sent.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    fields: Map<String, Value>,
}

impl Envelope {
    /// Create an envelope with the given type and no payload.
    pub fn new(kind: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(TYPE_FIELD.to_string(), Value::String(kind.into()));
        Self { fields }
    }

    /// Add a payload field. Setting `type` here is ignored.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        if field != TYPE_FIELD {
            self.fields.insert(field, value.into());
        }
        self
    }

    /// Parse an envelope from frame text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build an envelope from an arbitrary JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Self::from_fields(fields),
            other => Err(NetworkError::Json(format!(
                "envelope must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Serialize any value and check that it forms a valid envelope.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        Self::from_value(serde_json::to_value(value)?)
    }

    fn from_fields(fields: Map<String, Value>) -> Result<Self> {
        match fields.get(TYPE_FIELD) {
            Some(Value::String(_)) => Ok(Self { fields }),
            Some(other) => Err(NetworkError::Json(format!(
                "envelope field '{TYPE_FIELD}' must be a string, got {}",
                json_kind(other)
            ))),
            None => Err(NetworkError::Json(format!(
                "envelope is missing the '{TYPE_FIELD}' field"
            ))),
        }
    }

    /// The discriminator.
    pub fn kind(&self) -> &str {
        match self.fields.get(TYPE_FIELD) {
            Some(Value::String(kind)) => kind,
            _ => "",
        }
    }

    /// A single payload field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// All fields, discriminator included.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Decode the whole envelope into a typed payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&Value::Object(self.fields.clone()))?)
    }

    /// Serialize to frame text.
    pub fn to_json(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_fields(fields).map_err(de::Error::custom)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// What an inbound text frame turned out to be.
#[derive(Debug)]
pub enum Inbound {
    /// The heartbeat reply. Discarded.
    Sentinel,
    /// A valid envelope, ready for dispatch.
    Envelope(Envelope),
    /// Not JSON, not an object, or no string `type`. Dropped.
    Malformed(NetworkError),
}

impl Inbound {
    /// Classify a text frame. The sentinel is checked before any parsing.
    pub fn classify(text: &str, reply_sentinel: &str) -> Self {
        if text == reply_sentinel {
            return Self::Sentinel;
        }
        match Envelope::parse(text) {
            Ok(envelope) => Self::Envelope(envelope),
            Err(err) => Self::Malformed(err),
        }
    }
}
