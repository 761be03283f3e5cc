// moviedb-core/src/document.rs
//! Document model and the extended-JSON value types the store understands.
//!
//! Plain JSON has no notion of object references or dates, so both travel in
//! relaxed extended-JSON form:
//!
//! ```text
//! {"$oid": "65a1f0c2e4b0a1b2c3d4e5f6"}
//! {"$date": "2024-01-12T09:30:00.000Z"}
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{MovieDbError, Result};

pub const ID_FIELD: &str = "_id";

// ============================================================================
// ObjectId
// ============================================================================

/// 12-byte object identifier: 4 bytes of big-endian unix seconds, 8 random bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generate a fresh id stamped with the current time
    pub fn new() -> Self {
        let secs = Utc::now().timestamp() as u32;
        let random = Uuid::new_v4();
        let random = random.as_bytes();

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        // Skip the uuid version/variant bytes (6 and 8)
        bytes[4..6].copy_from_slice(&random[..2]);
        bytes[6..12].copy_from_slice(&random[10..16]);
        ObjectId(bytes)
    }

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Parse the 24-character hex form
    pub fn parse_str(s: &str) -> Result<Self> {
        if s.len() != 24 || !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(MovieDbError::Serialization(format!(
                "Invalid ObjectId '{}': expected 24 lowercase hex characters",
                s
            )));
        }

        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| {
                MovieDbError::Serialization(format!("Invalid ObjectId '{}': not hex", s))
            })?;
        }
        Ok(ObjectId(bytes))
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Creation time encoded in the first four bytes
    pub fn timestamp(&self) -> DateTime<Utc> {
        let secs = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        DateTime::from_timestamp(secs as i64, 0).unwrap_or_default()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId(\"{}\")", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = MovieDbError;

    fn from_str(s: &str) -> Result<Self> {
        ObjectId::parse_str(s)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct OidRepr {
    #[serde(rename = "$oid")]
    oid: String,
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("$oid", &self.to_hex())?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = OidRepr::deserialize(deserializer)?;
        ObjectId::parse_str(&repr.oid).map_err(de::Error::custom)
    }
}

// ============================================================================
// Date
// ============================================================================

/// UTC timestamp with millisecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Date(DateTime<Utc>);

impl Date {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Wraps a chrono timestamp, dropping sub-millisecond precision
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Date(DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or(dt))
    }

    /// Midnight UTC of a calendar day
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
        Some(Date(naive.and_utc()))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` days
impl FromStr for Date {
    type Err = MovieDbError;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Date::from_datetime(dt.with_timezone(&Utc)));
        }
        let day = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| MovieDbError::Serialization(format!("Invalid date '{}': {}", s, e)))?;
        Date::from_ymd(
            chrono::Datelike::year(&day),
            chrono::Datelike::month(&day),
            chrono::Datelike::day(&day),
        )
        .ok_or_else(|| MovieDbError::Serialization(format!("Invalid date '{}'", s)))
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DateRepr {
    #[serde(rename = "$date")]
    date: String,
}

impl Serialize for Date {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("$date", &self.to_rfc3339())?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = DateRepr::deserialize(deserializer)?;
        let dt = DateTime::parse_from_rfc3339(&repr.date).map_err(de::Error::custom)?;
        Ok(Date::from_datetime(dt.with_timezone(&Utc)))
    }
}

/// True if `value` is the extended-JSON form of an object id
pub fn is_object_id(value: &Value) -> bool {
    value
        .as_object()
        .filter(|map| map.len() == 1)
        .and_then(|map| map.get("$oid"))
        .and_then(Value::as_str)
        .map(|hex| ObjectId::parse_str(hex).is_ok())
        .unwrap_or(false)
}

/// True if `value` is the extended-JSON form of a date
pub fn is_date(value: &Value) -> bool {
    value
        .as_object()
        .filter(|map| map.len() == 1)
        .and_then(|map| map.get("$date"))
        .and_then(Value::as_str)
        .map(|s| DateTime::parse_from_rfc3339(s).is_ok())
        .unwrap_or(false)
}

// ============================================================================
// DocumentId
// ============================================================================

/// Document `_id` values
///
/// Untagged so that ids appear as plain values inside documents: `{"_id": 2}`,
/// `{"_id": {"$oid": "..."}}`. ObjectId is tried before String because its
/// representation is an object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(untagged)]
pub enum DocumentId {
    Int(i64),
    ObjectId(ObjectId),
    String(String),
}

impl DocumentId {
    /// Fresh ObjectId-based id
    pub fn new_object_id() -> Self {
        DocumentId::ObjectId(ObjectId::new())
    }

    pub fn to_value(&self) -> Value {
        match self {
            DocumentId::Int(i) => Value::from(*i),
            DocumentId::ObjectId(oid) => serde_json::json!({ "$oid": oid.to_hex() }),
            DocumentId::String(s) => Value::String(s.clone()),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| MovieDbError::Serialization(format!("Invalid _id format: {}", e)))
    }

    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            DocumentId::ObjectId(oid) => Some(*oid),
            _ => None,
        }
    }

    /// Interpret user input: 24 hex chars become an ObjectId, integers an Int
    pub fn parse(input: &str) -> Self {
        if let Ok(oid) = ObjectId::parse_str(input) {
            DocumentId::ObjectId(oid)
        } else if let Ok(i) = input.parse::<i64>() {
            DocumentId::Int(i)
        } else {
            DocumentId::String(input.to_string())
        }
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        DocumentId::ObjectId(oid)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Int(i) => write!(f, "{}", i),
            DocumentId::ObjectId(oid) => write!(f, "{}", oid),
            DocumentId::String(s) => f.write_str(s),
        }
    }
}

// ============================================================================
// Document
// ============================================================================

/// A stored document. `body` always carries `_id` equal to `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: DocumentId,
    body: Map<String, Value>,
}

impl Document {
    pub fn new(id: DocumentId, mut fields: Map<String, Value>) -> Self {
        fields.insert(ID_FIELD.to_string(), id.to_value());
        Document { id, body: fields }
    }

    /// Build from a JSON object that already has an `_id`
    pub fn from_value(value: Value) -> Result<Self> {
        let body = match value {
            Value::Object(map) => map,
            other => {
                return Err(MovieDbError::Serialization(format!(
                    "Document must be a JSON object, got {}",
                    other
                )))
            }
        };
        let id = body
            .get(ID_FIELD)
            .ok_or_else(|| MovieDbError::Serialization("Document has no _id".to_string()))
            .and_then(DocumentId::from_value)?;
        Ok(Document { id, body })
    }

    /// Serialize a typed record into a document with the given id
    pub fn from_record<T: Serialize>(id: DocumentId, record: &T) -> Result<Self> {
        match serde_json::to_value(record)? {
            Value::Object(map) => Ok(Document::new(id, map)),
            _ => Err(MovieDbError::Serialization(
                "Record must serialize to a JSON object".to_string(),
            )),
        }
    }

    pub fn into_record<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.body))?)
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Field lookup with dot notation (`"address.city"`, `"genres.0"`)
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.body, path)
    }

    /// Set a top-level field. `_id` is immutable and ignored.
    pub fn set(&mut self, field: &str, value: Value) {
        if field == ID_FIELD {
            return;
        }
        self.body.insert(field.to_string(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        if field == ID_FIELD {
            return None;
        }
        self.body.remove(field)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.body.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }
}

/// Resolve a dot-separated path against a JSON object
pub fn lookup_path<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut parts = path.split('.');
    let mut value = root.get(parts.next()?)?;
    for part in parts {
        value = match value {
            Value::Object(map) => map.get(part)?,
            Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_id_hex_form() {
        let oid = ObjectId::from_bytes([
            0x65, 0xa1, 0xf0, 0xc2, 0xe4, 0xb0, 0xa1, 0xb2, 0xc3, 0xd4, 0xe5, 0xf6,
        ]);
        assert_eq!(oid.to_hex(), "65a1f0c2e4b0a1b2c3d4e5f6");
        assert_eq!(ObjectId::parse_str("65a1f0c2e4b0a1b2c3d4e5f6").unwrap(), oid);
    }

    #[test]
    fn test_object_id_rejects_bad_input() {
        assert!(ObjectId::parse_str("xyz").is_err());
        assert!(ObjectId::parse_str("zza1f0c2e4b0a1b2c3d4e5f6").is_err());
        assert!(ObjectId::parse_str("+0+0+0+0+0+0+0+0+0+0+0+0").is_err());
        assert!(ObjectId::parse_str("ABCDEF0123456789ABCDEF01").is_err());
        assert!(!is_object_id(&json!({"$oid": "ABCDEF0123456789ABCDEF01"})));
        assert!(!is_object_id(&json!({"$oid": "+0+0+0+0+0+0+0+0+0+0+0+0"})));
    }

    #[test]
    fn test_object_id_timestamp_is_current() {
        let before = Utc::now().timestamp();
        let oid = ObjectId::new();
        let after = Utc::now().timestamp();
        let ts = oid.timestamp().timestamp();
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn test_object_ids_are_distinct() {
        assert_ne!(ObjectId::new(), ObjectId::new());
    }

    #[test]
    fn test_object_id_extended_json() {
        let oid = ObjectId::parse_str("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
        let value = serde_json::to_value(oid).unwrap();
        assert_eq!(value, json!({"$oid": "65a1f0c2e4b0a1b2c3d4e5f6"}));
        assert!(is_object_id(&value));
        assert!(!is_object_id(&json!("65a1f0c2e4b0a1b2c3d4e5f6")));
    }

    #[test]
    fn test_date_truncates_to_millis() {
        let date = Date::now();
        assert_eq!(date.as_datetime().timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_date_extended_json() {
        let date = Date::from_ymd(1970, 1, 2).unwrap();
        let value = serde_json::to_value(date).unwrap();
        assert_eq!(value, json!({"$date": "1970-01-02T00:00:00.000Z"}));
        assert!(is_date(&value));
        assert!(!is_date(&json!("1970-01-02")));
    }

    #[test]
    fn test_date_from_str_accepts_plain_day() {
        let date: Date = "1946-12-18".parse().unwrap();
        assert_eq!(date, Date::from_ymd(1946, 12, 18).unwrap());
        assert!("18/12/1946".parse::<Date>().is_err());
    }

    #[test]
    fn test_document_id_untagged_forms() {
        assert_eq!(
            DocumentId::from_value(&json!(7)).unwrap(),
            DocumentId::Int(7)
        );
        assert_eq!(
            DocumentId::from_value(&json!("abc")).unwrap(),
            DocumentId::String("abc".to_string())
        );
        let oid = ObjectId::new();
        assert_eq!(
            DocumentId::from_value(&json!({"$oid": oid.to_hex()})).unwrap(),
            DocumentId::ObjectId(oid)
        );
    }

    #[test]
    fn test_document_id_parse_user_input() {
        assert_eq!(DocumentId::parse("42"), DocumentId::Int(42));
        assert_eq!(
            DocumentId::parse("drama"),
            DocumentId::String("drama".to_string())
        );
        assert!(DocumentId::parse("65a1f0c2e4b0a1b2c3d4e5f6")
            .as_object_id()
            .is_some());
    }

    #[test]
    fn test_document_keeps_id_in_body() {
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!("Alice"));
        let doc = Document::new(DocumentId::Int(1), fields);

        assert_eq!(doc.get("_id"), Some(&json!(1)));
        assert_eq!(doc.get("name"), Some(&json!("Alice")));
    }

    #[test]
    fn test_document_id_cannot_be_overwritten() {
        let mut doc = Document::new(DocumentId::Int(1), Map::new());
        doc.set("_id", json!(2));
        assert!(doc.remove("_id").is_none());
        assert_eq!(doc.id(), &DocumentId::Int(1));
        assert_eq!(doc.get("_id"), Some(&json!(1)));
    }

    #[test]
    fn test_document_from_value_requires_id() {
        assert!(Document::from_value(json!({"name": "x"})).is_err());
        assert!(Document::from_value(json!([1, 2])).is_err());
        let doc = Document::from_value(json!({"_id": "a", "name": "x"})).unwrap();
        assert_eq!(doc.id(), &DocumentId::String("a".to_string()));
    }

    #[test]
    fn test_lookup_path_nested() {
        let doc = json!({"address": {"city": "NYC"}, "tags": ["a", "b"]});
        let map = doc.as_object().unwrap();
        assert_eq!(lookup_path(map, "address.city"), Some(&json!("NYC")));
        assert_eq!(lookup_path(map, "tags.1"), Some(&json!("b")));
        assert_eq!(lookup_path(map, "tags.x"), None);
        assert_eq!(lookup_path(map, ""), None);
    }
}
