// moviedb-core/src/collection_core/mod.rs
//
// ├── Constructor (index rebuild from storage)
// ├── Schema (set_schema, validation)
// ├── CRUD Operations: insert_one, insert_many, update_one, delete_one
// ├── Query Operations: find, find_with_options, find_one, find_by_id, count_documents
// └── Index Operations: create_index, drop_index, list_indexes
//
// Lock order: storage before indexes, everywhere.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::document::{Document, DocumentId, ID_FIELD};
use crate::error::{MovieDbError, Result};
use crate::find_options::FindOptions;
use crate::index::{IndexKey, IndexManager, IndexMetadata};
use crate::query::Query;
use crate::storage::Storage;

mod schema;
mod update;

pub use self::schema::{BsonType, CompiledSchema, PropertySchema};
use self::update::apply_update_operators;

/// Result of insert_many operation
#[derive(Debug, Clone)]
pub struct InsertManyResult {
    pub inserted_ids: Vec<DocumentId>,
    pub inserted_count: usize,
}

/// Result of update_one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// One collection: documents in storage plus validator and indexes in memory
///
/// Obtain handles through `DatabaseCore::collection`, which shares one
/// instance per name so that every caller sees the same indexes.
pub struct CollectionCore<S: Storage> {
    pub name: String,
    storage: Arc<RwLock<S>>,
    indexes: RwLock<IndexManager>,
    schema: RwLock<Option<CompiledSchema>>,
}

impl<S: Storage> CollectionCore<S> {
    // ========== CONSTRUCTOR ==========

    /// Open a collection, creating it in storage if needed
    pub fn new(name: String, storage: Arc<RwLock<S>>) -> Result<Self> {
        let (schema_definition, persisted_indexes, documents) = {
            let mut guard = storage.write();
            if guard.get_collection_meta(&name).is_none() {
                guard.create_collection(&name)?;
            }
            let meta = guard
                .get_collection_meta(&name)
                .ok_or_else(|| MovieDbError::CollectionNotFound(name.clone()))?;
            let schema = meta.schema.clone();
            let indexes = meta.indexes.clone();
            (schema, indexes, guard.scan_documents(&name)?)
        };

        let mut index_manager = IndexManager::new();
        index_manager.create_index(Self::id_index_name_for(&name), ID_FIELD.to_string(), true)?;
        for index_meta in &persisted_indexes {
            debug!(
                "Restoring index '{}' on field '{}'",
                index_meta.name, index_meta.field
            );
            index_manager.create_index(
                index_meta.name.clone(),
                index_meta.field.clone(),
                index_meta.unique,
            )?;
        }

        for doc in &documents {
            index_manager.insert_document(doc)?;
        }

        let compiled_schema = match schema_definition {
            Some(ref raw) => Some(CompiledSchema::from_value(raw)?),
            None => None,
        };

        debug!(
            "Opened collection '{}' with {} documents, {} indexes",
            name,
            documents.len(),
            persisted_indexes.len() + 1
        );

        Ok(CollectionCore {
            name,
            storage,
            indexes: RwLock::new(index_manager),
            schema: RwLock::new(compiled_schema),
        })
    }

    fn id_index_name_for(collection: &str) -> String {
        format!("{}_id", collection)
    }

    fn rejected(&self, op: &str, err: MovieDbError) -> MovieDbError {
        warn!("{} on '{}' rejected: {}", op, self.name, err);
        err
    }

    // ========== SCHEMA ==========

    /// Set or clear the validator for this collection
    pub fn set_schema(&self, schema: Option<Value>) -> Result<()> {
        let compiled = match schema {
            Some(ref raw) => Some(CompiledSchema::from_value(raw)?),
            None => None,
        };

        {
            let mut storage = self.storage.write();
            let meta = storage
                .get_collection_meta_mut(&self.name)
                .ok_or_else(|| MovieDbError::CollectionNotFound(self.name.clone()))?;
            meta.schema = schema;
        }

        *self.schema.write() = compiled;
        Ok(())
    }

    /// The raw validator document, if one is set
    pub fn schema(&self) -> Option<Value> {
        self.storage
            .read()
            .get_collection_meta(&self.name)
            .and_then(|meta| meta.schema.clone())
    }

    fn validate_document(&self, document: &Document) -> Result<()> {
        match self.schema.read().as_ref() {
            Some(schema) => schema.validate(&Value::Object(document.fields().clone())),
            None => Ok(()),
        }
    }

    // ========== CRUD OPERATIONS ==========

    /// Insert one document - returns inserted DocumentId
    ///
    /// Uses the `_id` in `fields` when present, otherwise generates an ObjectId.
    /// Validation and unique checks run before anything is written.
    pub fn insert_one(&self, mut fields: Map<String, Value>) -> Result<DocumentId> {
        let doc_id = match fields.remove(ID_FIELD) {
            Some(raw) => DocumentId::from_value(&raw)?,
            None => DocumentId::new_object_id(),
        };
        let doc = Document::new(doc_id.clone(), fields);

        self.validate_document(&doc)
            .map_err(|e| self.rejected("insert", e))?;

        let mut storage = self.storage.write();
        let mut indexes = self.indexes.write();
        indexes
            .check_document(&doc)
            .map_err(|e| self.rejected("insert", e))?;

        storage.insert_document(&self.name, &doc)?;
        indexes.insert_document(&doc)?;

        debug!("Inserted {} into '{}'", doc_id, self.name);
        Ok(doc_id)
    }

    /// Insert documents in order, stopping at the first failure.
    /// Documents before the failing one stay inserted.
    pub fn insert_many(&self, documents: Vec<Map<String, Value>>) -> Result<InsertManyResult> {
        let mut inserted_ids = Vec::with_capacity(documents.len());
        for fields in documents {
            inserted_ids.push(self.insert_one(fields)?);
        }
        Ok(InsertManyResult {
            inserted_count: inserted_ids.len(),
            inserted_ids,
        })
    }

    /// Apply `$set`/`$unset`/`$inc` to the first document matching `filter`
    pub fn update_one(&self, filter: &Value, update: &Value) -> Result<UpdateResult> {
        let query = Query::from_value(filter)?;

        let mut storage = self.storage.write();
        let original = match self.collect_matches(&*storage, &query, Some(1))?.into_iter().next() {
            Some(doc) => doc,
            None => {
                return Ok(UpdateResult {
                    matched_count: 0,
                    modified_count: 0,
                })
            }
        };

        let mut updated = original.clone();
        if !apply_update_operators(&mut updated, update)? {
            return Ok(UpdateResult {
                matched_count: 1,
                modified_count: 0,
            });
        }

        self.validate_document(&updated)
            .map_err(|e| self.rejected("update", e))?;

        let mut indexes = self.indexes.write();
        indexes
            .check_document(&updated)
            .map_err(|e| self.rejected("update", e))?;

        storage.replace_document(&self.name, &updated)?;
        indexes.remove_document(&original);
        indexes.insert_document(&updated)?;

        debug!("Updated {} in '{}'", updated.id(), self.name);
        Ok(UpdateResult {
            matched_count: 1,
            modified_count: 1,
        })
    }

    /// Delete the first document matching `filter`; returns the deleted count
    pub fn delete_one(&self, filter: &Value) -> Result<u64> {
        let query = Query::from_value(filter)?;

        let mut storage = self.storage.write();
        let doc = match self.collect_matches(&*storage, &query, Some(1))?.into_iter().next() {
            Some(doc) => doc,
            None => return Ok(0),
        };

        if !storage.delete_document(&self.name, doc.id())? {
            return Ok(0);
        }
        self.indexes.write().remove_document(&doc);

        debug!("Deleted {} from '{}'", doc.id(), self.name);
        Ok(1)
    }

    // ========== QUERY OPERATIONS ==========

    /// Find documents matching filter
    pub fn find(&self, filter: &Value) -> Result<Vec<Document>> {
        let query = Query::from_value(filter)?;
        let storage = self.storage.read();
        self.collect_matches(&*storage, &query, None)
    }

    pub fn find_with_options(&self, filter: &Value, options: &FindOptions) -> Result<Vec<Document>> {
        Ok(options.apply(self.find(filter)?))
    }

    pub fn find_one(&self, filter: &Value) -> Result<Option<Document>> {
        let query = Query::from_value(filter)?;
        let storage = self.storage.read();
        Ok(self
            .collect_matches(&*storage, &query, Some(1))?
            .into_iter()
            .next())
    }

    pub fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>> {
        self.storage.read().read_document(&self.name, id)
    }

    pub fn count_documents(&self, filter: &Value) -> Result<u64> {
        Ok(self.find(filter)?.len() as u64)
    }

    /// Candidate documents through an index when the filter has an equality on
    /// an indexed field, otherwise a full scan; then the full filter.
    fn collect_matches(&self, storage: &S, query: &Query, limit: Option<usize>) -> Result<Vec<Document>> {
        let limit = limit.unwrap_or(usize::MAX);

        let candidate_ids = {
            let indexes = self.indexes.read();
            query.equality_conditions().find_map(|(field, value)| {
                indexes.index_for_field(field).map(|index| {
                    debug!("find on '{}' using index '{}'", self.name, index.metadata.name);
                    index.lookup(&IndexKey::from(value))
                })
            })
        };

        let candidates = match candidate_ids {
            Some(ids) => {
                let mut docs = Vec::with_capacity(ids.len());
                for id in &ids {
                    if let Some(doc) = storage.read_document(&self.name, id)? {
                        docs.push(doc);
                    }
                }
                docs
            }
            None => storage.scan_documents(&self.name)?,
        };

        Ok(candidates
            .into_iter()
            .filter(|doc| query.matches(doc))
            .take(limit)
            .collect())
    }

    // ========== INDEX OPERATIONS ==========

    /// Create an ascending index on `field`; returns its name (`<collection>_<field>`)
    ///
    /// Fails without side effects if existing documents violate `unique`.
    pub fn create_index(&self, field: String, unique: bool) -> Result<String> {
        let index_name = format!("{}_{}", self.name, field);

        let mut storage = self.storage.write();
        let documents = storage.scan_documents(&self.name)?;

        let mut indexes = self.indexes.write();
        indexes.create_index(index_name.clone(), field.clone(), unique)?;

        let populated = match indexes.get_mut(&index_name) {
            Some(index) => documents.iter().try_for_each(|doc| {
                index
                    .extract_keys(doc)
                    .into_iter()
                    .try_for_each(|key| index.insert(key, doc.id().clone()))
            }),
            None => Err(MovieDbError::IndexError(format!(
                "Index '{}' vanished during build",
                index_name
            ))),
        };
        if let Err(e) = populated {
            indexes.drop_index(&index_name)?;
            return Err(self.rejected("create_index", e));
        }

        let meta = storage
            .get_collection_meta_mut(&self.name)
            .ok_or_else(|| MovieDbError::CollectionNotFound(self.name.clone()))?;
        meta.indexes.push(IndexMetadata {
            name: index_name.clone(),
            field,
            unique,
        });

        debug!("Created index '{}'", index_name);
        Ok(index_name)
    }

    /// Drop a secondary index. The `_id` index cannot be dropped.
    pub fn drop_index(&self, index_name: &str) -> Result<()> {
        if index_name == Self::id_index_name_for(&self.name) {
            return Err(MovieDbError::IndexError(
                "Cannot drop the _id index".to_string(),
            ));
        }

        let mut storage = self.storage.write();
        self.indexes.write().drop_index(index_name)?;
        if let Some(meta) = storage.get_collection_meta_mut(&self.name) {
            meta.indexes.retain(|idx| idx.name != index_name);
        }
        Ok(())
    }

    /// Index names, including the implicit `_id` index
    pub fn list_indexes(&self) -> Vec<String> {
        self.indexes.read().list_indexes()
    }

    pub fn index_metadata(&self) -> Vec<IndexMetadata> {
        self.indexes.read().metadata()
    }

    /// Number of entries in an index
    pub fn index_size(&self, index_name: &str) -> Option<usize> {
        self.indexes.read().get(index_name).map(|idx| idx.size())
    }
}
