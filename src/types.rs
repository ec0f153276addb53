//! Common types used throughout Solidafy Pager
//!
//! This module contains the document model, the identifying key type and
//! small utility types shared across modules.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub use mongodb::bson::oid::ObjectId;
pub use mongodb::bson::{doc, Bson, Document};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Default identifying key field
pub const DEFAULT_ID_FIELD: &str = "_id";

// ============================================================================
// Identifying Key
// ============================================================================

/// Value of a document's identifying key field
///
/// Keys compare the way the store compares them: numbers sort before
/// strings, strings before object ids, and values of the same type use
/// their natural order. Comparisons are never lexical across types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "KeyRepr", into = "KeyRepr")]
pub enum Key {
    /// 32 or 64 bit integer
    Int(i64),
    /// UTF-8 string
    String(String),
    /// Generated sortable identifier
    ObjectId(ObjectId),
}

impl Key {
    /// Extract a key from a BSON value
    pub fn from_bson(value: &Bson) -> Result<Self> {
        match value {
            Bson::Int32(i) => Ok(Self::Int(i64::from(*i))),
            Bson::Int64(i) => Ok(Self::Int(*i)),
            Bson::String(s) => Ok(Self::String(s.clone())),
            Bson::ObjectId(oid) => Ok(Self::ObjectId(*oid)),
            other => Err(Error::decode(format!(
                "unsupported key type {:?}",
                other.element_type()
            ))),
        }
    }

    /// Extract the key stored under `field` in a document
    pub fn from_document(document: &Document, field: &str) -> Result<Self> {
        let value = document
            .get(field)
            .ok_or_else(|| Error::decode(format!("document has no '{field}' field")))?;
        Self::from_bson(value)
    }

    /// Parse a key typed on the command line or stored as text
    ///
    /// 24 hex characters parse as an object id, anything that parses as an
    /// integer becomes an integer, everything else is a string.
    pub fn parse(input: &str) -> Self {
        if input.len() == 24 {
            if let Ok(oid) = ObjectId::parse_str(input) {
                return Self::ObjectId(oid);
            }
        }
        if let Ok(i) = input.parse::<i64>() {
            return Self::Int(i);
        }
        Self::String(input.to_string())
    }

    /// Parse a key as a given type
    ///
    /// `KeyType::Auto` behaves like [`Key::parse`]. Forcing a type lets a
    /// string-keyed collection page after `"25"` instead of the number 25.
    pub fn parse_as(input: &str, key_type: KeyType) -> Result<Self> {
        match key_type {
            KeyType::Auto => Ok(Self::parse(input)),
            KeyType::Int => input.parse::<i64>().map(Self::Int).map_err(|e| {
                Error::invalid_value("after", format!("'{input}' is not an integer key: {e}"))
            }),
            KeyType::String => Ok(Self::String(input.to_string())),
            KeyType::ObjectId => ObjectId::parse_str(input)
                .map(Self::ObjectId)
                .map_err(|e| {
                    Error::invalid_value("after", format!("'{input}' is not an object id: {e}"))
                }),
        }
    }

    /// Convert to the BSON value used in store filters
    pub fn to_bson(&self) -> Bson {
        match self {
            Self::Int(i) => Bson::Int64(*i),
            Self::String(s) => Bson::String(s.clone()),
            Self::ObjectId(oid) => Bson::ObjectId(*oid),
        }
    }

    /// Whether both keys fall in the same type bracket
    ///
    /// A range comparison against a store only matches keys of the bound's
    /// own type; numbers never compare greater than strings and so on.
    pub fn same_type(&self, other: &Key) -> bool {
        self.type_rank() == other.type_rank()
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Int(_) => 0,
            Self::String(_) => 1,
            Self::ObjectId(_) => 2,
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::ObjectId(a), Self::ObjectId(b)) => a.bytes().cmp(&b.bytes()),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::String(s) => f.write_str(s),
            Self::ObjectId(oid) => f.write_str(&oid.to_hex()),
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<ObjectId> for Key {
    fn from(value: ObjectId) -> Self {
        Self::ObjectId(value)
    }
}

impl From<Key> for Bson {
    fn from(key: Key) -> Self {
        key.to_bson()
    }
}

/// Serialized form of a key (checkpoints, JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
enum KeyRepr {
    Int(i64),
    String(String),
    ObjectId(String),
}

impl TryFrom<KeyRepr> for Key {
    type Error = String;

    fn try_from(repr: KeyRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            KeyRepr::Int(i) => Ok(Key::Int(i)),
            KeyRepr::String(s) => Ok(Key::String(s)),
            KeyRepr::ObjectId(hex) => ObjectId::parse_str(&hex)
                .map(Key::ObjectId)
                .map_err(|e| format!("invalid object id '{hex}': {e}")),
        }
    }
}

impl From<Key> for KeyRepr {
    fn from(key: Key) -> Self {
        match key {
            Key::Int(i) => KeyRepr::Int(i),
            Key::String(s) => KeyRepr::String(s),
            Key::ObjectId(oid) => KeyRepr::ObjectId(oid.to_hex()),
        }
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

/// How to read a key typed as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum KeyType {
    /// Infer from the text
    #[default]
    Auto,
    /// 64 bit integer
    Int,
    /// String, even when the text looks numeric
    String,
    /// 24 hex character object id
    #[value(alias = "oid")]
    ObjectId,
}

// ============================================================================
// Utilities
// ============================================================================

/// Render a document as relaxed extended JSON
pub fn document_to_json(document: &Document) -> JsonValue {
    Bson::Document(document.clone()).into_relaxed_extjson()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_order_within_type() {
        assert!(Key::Int(2) < Key::Int(10));
        assert!(Key::from("apple") < Key::from("banana"));

        let first = ObjectId::parse_str("65a000000000000000000001").unwrap();
        let second = ObjectId::parse_str("65a000000000000000000002").unwrap();
        assert!(Key::ObjectId(first) < Key::ObjectId(second));
    }

    #[test]
    fn test_key_order_is_numeric_not_lexical() {
        // "10" < "9" lexically
        assert!(Key::Int(9) < Key::Int(10));
    }

    #[test]
    fn test_key_order_across_types() {
        let oid = ObjectId::new();
        assert!(Key::Int(i64::MAX) < Key::from(""));
        assert!(Key::from("zzz") < Key::ObjectId(oid));
    }

    #[test]
    fn test_key_from_bson() {
        assert_eq!(Key::from_bson(&Bson::Int32(7)).unwrap(), Key::Int(7));
        assert_eq!(Key::from_bson(&Bson::Int64(7)).unwrap(), Key::Int(7));
        assert_eq!(
            Key::from_bson(&Bson::String("a".into())).unwrap(),
            Key::from("a")
        );

        let err = Key::from_bson(&Bson::Boolean(true)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Decode);
    }

    #[test]
    fn test_key_from_document() {
        let document = doc! { "_id": 42, "title": "Metropolis" };
        assert_eq!(Key::from_document(&document, "_id").unwrap(), Key::Int(42));
        assert!(Key::from_document(&document, "missing").is_err());
    }

    #[test]
    fn test_key_parse() {
        assert_eq!(Key::parse("25"), Key::Int(25));
        assert_eq!(Key::parse("-3"), Key::Int(-3));
        assert_eq!(Key::parse("tt0012349"), Key::from("tt0012349"));

        let parsed = Key::parse("573a1390f29313caabcd4135");
        assert!(matches!(parsed, Key::ObjectId(_)));
        assert_eq!(parsed.to_string(), "573a1390f29313caabcd4135");
    }

    #[test]
    fn test_key_parse_as() {
        assert_eq!(Key::parse_as("25", KeyType::Auto).unwrap(), Key::Int(25));
        assert_eq!(Key::parse_as("25", KeyType::String).unwrap(), Key::from("25"));
        assert_eq!(Key::parse_as("25", KeyType::Int).unwrap(), Key::Int(25));

        let oid = Key::parse_as("573a1390f29313caabcd4135", KeyType::ObjectId).unwrap();
        assert_eq!(oid.to_string(), "573a1390f29313caabcd4135");
        assert_eq!(
            Key::parse_as("573a1390f29313caabcd4135", KeyType::String).unwrap(),
            Key::from("573a1390f29313caabcd4135")
        );

        let err = Key::parse_as("tt0042", KeyType::Int).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
        assert!(Key::parse_as("25", KeyType::ObjectId).is_err());
    }

    #[test]
    fn test_key_serde() {
        let json = serde_json::to_string(&Key::Int(5)).unwrap();
        assert_eq!(json, r#"{"type":"int","value":5}"#);

        let oid = ObjectId::parse_str("573a1390f29313caabcd4135").unwrap();
        let json = serde_json::to_string(&Key::ObjectId(oid)).unwrap();
        assert_eq!(
            json,
            r#"{"type":"object_id","value":"573a1390f29313caabcd4135"}"#
        );
        let back: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Key::ObjectId(oid));

        let bad: std::result::Result<Key, _> =
            serde_json::from_str(r#"{"type":"object_id","value":"nope"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_document_to_json() {
        let document = doc! { "_id": 1, "title": "The Great Train Robbery" };
        let json = document_to_json(&document);
        assert_eq!(json["_id"], 1);
        assert_eq!(json["title"], "The Great Train Robbery");
    }
}
