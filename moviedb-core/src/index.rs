// moviedb-core/src/index.rs
// Ordered single-field indexes

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Date, Document, DocumentId, ObjectId};
use crate::error::{MovieDbError, Result};

/// Index key - supported types for indexing
///
/// Ordering follows the usual document-store type order:
/// null < numbers < strings < object ids < bools < dates.
/// Ints and floats compare numerically with each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IndexKey {
    Null,
    Int(i64),
    Float(OrderedFloat),
    String(String),
    ObjectId(ObjectId),
    Bool(bool),
    Date(Date),
}

/// OrderedFloat wrapper for f64 to enable Ord
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderedFloat {}

impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.is_nan(), other.0.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal),
        }
    }
}

impl IndexKey {
    fn type_rank(&self) -> u8 {
        match self {
            IndexKey::Null => 0,
            IndexKey::Int(_) | IndexKey::Float(_) => 1,
            IndexKey::String(_) => 2,
            IndexKey::ObjectId(_) => 3,
            IndexKey::Bool(_) => 4,
            IndexKey::Date(_) => 5,
        }
    }
}

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexKey {}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        use IndexKey::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.cmp(b),
            (Int(a), Float(b)) => OrderedFloat(*a as f64).cmp(b),
            (Float(a), Int(b)) => a.cmp(&OrderedFloat(*b as f64)),
            (String(a), String(b)) => a.cmp(b),
            (ObjectId(a), ObjectId(b)) => a.cmp(b),
            (Bool(a), Bool(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Null => f.write_str("null"),
            IndexKey::Int(i) => write!(f, "{}", i),
            IndexKey::Float(x) => write!(f, "{}", x.0),
            IndexKey::String(s) => write!(f, "{:?}", s),
            IndexKey::ObjectId(oid) => write!(f, "ObjectId(\"{}\")", oid),
            IndexKey::Bool(b) => write!(f, "{}", b),
            IndexKey::Date(d) => write!(f, "Date(\"{}\")", d),
        }
    }
}

/// Convert serde_json::Value to IndexKey
impl From<&Value> for IndexKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => IndexKey::Null,
            Value::Bool(b) => IndexKey::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    IndexKey::Int(i)
                } else if let Some(f) = n.as_f64() {
                    IndexKey::Float(OrderedFloat(f))
                } else {
                    IndexKey::Null
                }
            }
            Value::String(s) => IndexKey::String(s.clone()),
            Value::Object(_) => {
                if let Ok(oid) = serde_json::from_value::<ObjectId>(value.clone()) {
                    IndexKey::ObjectId(oid)
                } else if let Ok(date) = serde_json::from_value::<Date>(value.clone()) {
                    IndexKey::Date(date)
                } else {
                    IndexKey::Null
                }
            }
            // Nested arrays have no scalar key
            Value::Array(_) => IndexKey::Null,
        }
    }
}

impl From<&DocumentId> for IndexKey {
    fn from(id: &DocumentId) -> Self {
        match id {
            DocumentId::Int(i) => IndexKey::Int(*i),
            DocumentId::ObjectId(oid) => IndexKey::ObjectId(*oid),
            DocumentId::String(s) => IndexKey::String(s.clone()),
        }
    }
}

/// Index metadata, persisted with the collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub name: String,
    pub field: String,
    pub unique: bool,
}

/// Ordered single-field index
#[derive(Debug, Clone)]
pub struct BTreeIndex {
    pub metadata: IndexMetadata,
    entries: BTreeMap<IndexKey, BTreeSet<DocumentId>>,
    num_entries: usize,
}

impl BTreeIndex {
    pub fn new(name: String, field: String, unique: bool) -> Self {
        BTreeIndex {
            metadata: IndexMetadata {
                name,
                field,
                unique,
            },
            entries: BTreeMap::new(),
            num_entries: 0,
        }
    }

    /// Keys for a document: one per distinct array element, null when missing
    pub fn extract_keys(&self, doc: &Document) -> Vec<IndexKey> {
        let mut keys = match doc.get(&self.metadata.field) {
            None => vec![IndexKey::Null],
            Some(Value::Array(items)) if items.is_empty() => vec![IndexKey::Null],
            Some(Value::Array(items)) => items.iter().map(IndexKey::from).collect(),
            Some(value) => vec![IndexKey::from(value)],
        };
        keys.sort();
        keys.dedup();
        keys
    }

    /// Fails if inserting `key` for `doc_id` would break the unique constraint
    pub fn check_insert(&self, key: &IndexKey, doc_id: &DocumentId) -> Result<()> {
        if !self.metadata.unique {
            return Ok(());
        }
        match self.entries.get(key) {
            Some(ids) if ids.iter().any(|id| id != doc_id) => Err(MovieDbError::DuplicateKey {
                index: self.metadata.name.clone(),
                key: key.to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub fn insert(&mut self, key: IndexKey, doc_id: DocumentId) -> Result<()> {
        self.check_insert(&key, &doc_id)?;
        if self.entries.entry(key).or_default().insert(doc_id) {
            self.num_entries += 1;
        }
        Ok(())
    }

    pub fn delete(&mut self, key: &IndexKey, doc_id: &DocumentId) {
        if let Some(ids) = self.entries.get_mut(key) {
            if ids.remove(doc_id) {
                self.num_entries -= 1;
            }
            if ids.is_empty() {
                self.entries.remove(key);
            }
        }
    }

    /// Ids stored under `key`, in id order
    pub fn lookup(&self, key: &IndexKey) -> Vec<DocumentId> {
        self.entries
            .get(key)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// All ids in key order; multikey documents appear once per key
    pub fn scan(&self) -> impl Iterator<Item = &DocumentId> {
        self.entries.values().flat_map(|ids| ids.iter())
    }

    pub fn size(&self) -> usize {
        self.num_entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.num_entries = 0;
    }
}

/// All indexes of one collection
#[derive(Debug, Default)]
pub struct IndexManager {
    indexes: HashMap<String, BTreeIndex>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_index(&mut self, name: String, field: String, unique: bool) -> Result<()> {
        if self.indexes.contains_key(&name) {
            return Err(MovieDbError::IndexError(format!(
                "Index '{}' already exists",
                name
            )));
        }
        self.indexes
            .insert(name.clone(), BTreeIndex::new(name, field, unique));
        Ok(())
    }

    pub fn drop_index(&mut self, name: &str) -> Result<()> {
        self.indexes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| MovieDbError::IndexError(format!("Index '{}' not found", name)))
    }

    pub fn get(&self, name: &str) -> Option<&BTreeIndex> {
        self.indexes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut BTreeIndex> {
        self.indexes.get_mut(name)
    }

    /// First index covering `field`, preferring unique ones
    pub fn index_for_field(&self, field: &str) -> Option<&BTreeIndex> {
        let mut candidates: Vec<&BTreeIndex> = self
            .indexes
            .values()
            .filter(|idx| idx.metadata.field == field)
            .collect();
        candidates.sort_by(|a, b| {
            b.metadata
                .unique
                .cmp(&a.metadata.unique)
                .then_with(|| a.metadata.name.cmp(&b.metadata.name))
        });
        candidates.into_iter().next()
    }

    pub fn list_indexes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn metadata(&self) -> Vec<IndexMetadata> {
        let mut metas: Vec<IndexMetadata> =
            self.indexes.values().map(|idx| idx.metadata.clone()).collect();
        metas.sort_by(|a, b| a.name.cmp(&b.name));
        metas
    }

    /// Check every unique constraint for `doc` without mutating anything
    pub fn check_document(&self, doc: &Document) -> Result<()> {
        for index in self.indexes.values() {
            for key in index.extract_keys(doc) {
                index.check_insert(&key, doc.id())?;
            }
        }
        Ok(())
    }

    /// Add `doc` to every index. Call `check_document` first.
    pub fn insert_document(&mut self, doc: &Document) -> Result<()> {
        for index in self.indexes.values_mut() {
            for key in index.extract_keys(doc) {
                index.insert(key, doc.id().clone())?;
            }
        }
        Ok(())
    }

    pub fn remove_document(&mut self, doc: &Document) {
        for index in self.indexes.values_mut() {
            for key in index.extract_keys(doc) {
                index.delete(&key, doc.id());
            }
        }
    }
}
