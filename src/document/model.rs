//! Document model and write clock

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A stored document.
///
/// `id` is kept apart from the other fields; the serialized form is a flat
/// JSON object with `id` as a hyphenated lowercase UUID string.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: Uuid, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// Looks up a field; `id` resolves to its string form.
    pub fn get(&self, field: &str) -> Option<Cow<'_, Value>> {
        if field == "id" {
            return Some(Cow::Owned(Value::String(self.id.to_string())));
        }
        self.fields.get(field).map(Cow::Borrowed)
    }

    /// The flat JSON form of the document
    pub fn to_value(&self) -> Value {
        let mut obj = Map::with_capacity(self.fields.len() + 1);
        obj.insert("id".into(), Value::String(self.id.to_string()));
        for (key, value) in &self.fields {
            obj.insert(key.clone(), value.clone());
        }
        Value::Object(obj)
    }

    /// Parses a flat JSON object carrying an `id`.
    pub fn from_value(value: Value) -> Result<Self, DocumentFormatError> {
        let Value::Object(mut fields) = value else {
            return Err(DocumentFormatError::NotAnObject);
        };

        let id = match fields.remove("id") {
            Some(Value::String(s)) => {
                Uuid::parse_str(&s).map_err(|_| DocumentFormatError::InvalidId(s))?
            }
            Some(other) => return Err(DocumentFormatError::InvalidId(other.to_string())),
            None => return Err(DocumentFormatError::MissingId),
        };

        Ok(Self { id, fields })
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Document::from_value(value).map_err(de::Error::custom)
    }
}

/// Why a JSON value is not a document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentFormatError {
    #[error("document must be a JSON object")]
    NotAnObject,
    #[error("document has no id")]
    MissingId,
    #[error("document id '{0}' is not a UUID")]
    InvalidId(String),
}

/// Source of write timestamps
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Renders a timestamp as RFC 3339 with millisecond precision and `Z`.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
