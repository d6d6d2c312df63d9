//! Map-backed legacy record with typed accessors.
//!
//! The legacy backend returns loosely-typed JSON objects. Values arrive in a
//! few shapes depending on the column type: plain scalars, tagged dates
//! (`{"__type": "Date", "iso": ...}`), pointers or included objects carrying an
//! `objectId`, and file descriptors carrying a `url`. The accessors below accept
//! every shape so callers never inspect raw JSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::entity::EntityKind;

const ID_FIELD: &str = "objectId";
const CREATED_AT_FIELD: &str = "createdAt";
const UPDATED_AT_FIELD: &str = "updatedAt";

/// One immutable row read from the legacy backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyRecord {
    kind: EntityKind,
    id: String,
    fields: Map<String, Value>,
}

impl LegacyRecord {
    /// Creates an empty record. Mostly useful for tests and fixtures.
    #[must_use]
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into(), fields: Map::new() }
    }

    /// Wraps a JSON object returned by the legacy backend.
    ///
    /// Returns `None` when the value is not an object or has no `objectId`.
    #[must_use]
    pub fn from_json(kind: EntityKind, value: Value) -> Option<Self> {
        let Value::Object(fields) = value else {
            return None;
        };
        let id = fields.get(ID_FIELD)?.as_str()?.to_owned();
        Some(Self { kind, id, fields })
    }

    /// Adds or replaces a field.
    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_owned(), value.into());
        self
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw field access for context reporting.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// String field, `None` when absent, null or not a string.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.raw(key)?.as_str()
    }

    /// String field with surrounding whitespace removed; blank counts as absent.
    #[must_use]
    pub fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.str_field(key).map(str::trim).filter(|s| !s.is_empty())
    }

    /// Numeric field. Numeric strings are accepted.
    #[must_use]
    pub fn f64_field(&self, key: &str) -> Option<f64> {
        let value = match self.raw(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|n| n.is_finite())
    }

    #[must_use]
    pub fn bool_field(&self, key: &str) -> Option<bool> {
        match self.raw(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Timestamp field, either an RFC 3339 string or a tagged date object.
    #[must_use]
    pub fn datetime_field(&self, key: &str) -> Option<DateTime<Utc>> {
        let iso = match self.raw(key)? {
            Value::String(s) => s.as_str(),
            Value::Object(obj) => obj.get("iso")?.as_str()?,
            _ => return None,
        };
        DateTime::parse_from_rfc3339(iso).ok().map(|dt| dt.with_timezone(&Utc))
    }

    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.datetime_field(CREATED_AT_FIELD)
    }

    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.datetime_field(UPDATED_AT_FIELD)
    }

    /// Identifier of a referenced record: pointer, included object or bare id.
    #[must_use]
    pub fn pointer_id(&self, key: &str) -> Option<&str> {
        let id = match self.raw(key)? {
            Value::String(s) => s.as_str(),
            Value::Object(obj) => obj.get(ID_FIELD)?.as_str()?,
            _ => return None,
        };
        Some(id).filter(|s| !s.is_empty())
    }

    /// URL of a file field: file descriptor object or bare URL string.
    #[must_use]
    pub fn file_url(&self, key: &str) -> Option<&str> {
        let url = match self.raw(key)? {
            Value::String(s) => s.as_str(),
            Value::Object(obj) => obj.get("url")?.as_str()?,
            _ => return None,
        };
        Some(url.trim()).filter(|s| !s.is_empty())
    }
}
