// moviedb-core/src/database.rs
// Named database over one storage backend

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use crate::collection_core::CollectionCore;
use crate::error::{MovieDbError, Result};
use crate::storage::{FileStorage, MemoryStorage, Storage};

/// Options for `DatabaseCore::create_collection`
#[derive(Debug, Clone, Default)]
pub struct CollectionOptions {
    /// `$jsonSchema` validator enforced on every write
    pub validator: Option<Value>,
}

impl CollectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validator(mut self, validator: Value) -> Self {
        self.validator = Some(validator);
        self
    }
}

/// A named database
///
/// Generic over Storage backend:
/// - `DatabaseCore<FileStorage>` - persistent JSON snapshot
/// - `DatabaseCore<MemoryStorage>` - in-memory, for tests
///
/// Collection handles are cached and shared, so indexes are built once per
/// collection and every caller sees the same unique constraints.
pub struct DatabaseCore<S: Storage> {
    name: String,
    storage: Arc<RwLock<S>>,
    collections: RwLock<HashMap<String, Arc<CollectionCore<S>>>>,
}

impl DatabaseCore<FileStorage> {
    /// Open or create a database file
    pub fn open<P: AsRef<Path>>(name: &str, path: P) -> Result<Self> {
        let storage = FileStorage::open(path.as_ref())?;
        info!("Opened database '{}' at {}", name, path.as_ref().display());
        Ok(Self::with_storage(name, storage))
    }
}

impl DatabaseCore<MemoryStorage> {
    /// Fresh in-memory database
    pub fn in_memory(name: &str) -> Self {
        Self::with_storage(name, MemoryStorage::new())
    }
}

impl<S: Storage> DatabaseCore<S> {
    pub fn with_storage(name: &str, storage: S) -> Self {
        DatabaseCore {
            name: name.to_string(),
            storage: Arc::new(RwLock::new(storage)),
            collections: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a collection with options. Fails if it already exists.
    pub fn create_collection(
        &self,
        name: &str,
        options: CollectionOptions,
    ) -> Result<Arc<CollectionCore<S>>> {
        let mut cache = self.collections.write();
        if self.storage.read().get_collection_meta(name).is_some() {
            return Err(MovieDbError::CollectionExists(name.to_string()));
        }

        let collection = Arc::new(CollectionCore::new(
            name.to_string(),
            Arc::clone(&self.storage),
        )?);
        if let Err(e) = collection.set_schema(options.validator) {
            self.storage.write().drop_collection(name)?;
            return Err(e);
        }

        debug!("Created collection '{}' in '{}'", name, self.name);
        cache.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }

    /// Get collection (creates a plain one if it doesn't exist)
    pub fn collection(&self, name: &str) -> Result<Arc<CollectionCore<S>>> {
        if let Some(existing) = self.collections.read().get(name) {
            return Ok(Arc::clone(existing));
        }

        let mut cache = self.collections.write();
        if let Some(existing) = cache.get(name) {
            return Ok(Arc::clone(existing));
        }
        let collection = Arc::new(CollectionCore::new(
            name.to_string(),
            Arc::clone(&self.storage),
        )?);
        cache.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.storage.read().get_collection_meta(name).is_some()
    }

    /// List all collection names
    pub fn list_collections(&self) -> Vec<String> {
        self.storage.read().list_collections()
    }

    /// Drop collection with its documents, validator and indexes
    pub fn drop_collection(&self, name: &str) -> Result<()> {
        let mut cache = self.collections.write();
        self.storage.write().drop_collection(name)?;
        cache.remove(name);
        debug!("Dropped collection '{}' from '{}'", name, self.name);
        Ok(())
    }

    /// Flush all changes to persistent storage
    pub fn flush(&self) -> Result<()> {
        self.storage.write().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_collection_handles_are_shared() {
        let db = DatabaseCore::in_memory("MovieDB");
        let a = db.collection("genres").unwrap();
        let b = db.collection("genres").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(db.list_collections(), vec!["genres".to_string()]);
    }

    #[test]
    fn test_create_collection_with_validator() {
        let db = DatabaseCore::in_memory("MovieDB");
        let coll = db
            .create_collection(
                "genres",
                CollectionOptions::new().with_validator(json!({
                    "$jsonSchema": {"bsonType": "object", "required": ["name"]}
                })),
            )
            .unwrap();

        assert!(coll.schema().is_some());
        let result = db
            .collection("genres")
            .unwrap()
            .insert_one(serde_json::Map::new());
        assert!(matches!(result, Err(MovieDbError::SchemaError(_))));
    }

    #[test]
    fn test_create_existing_collection_fails() {
        let db = DatabaseCore::in_memory("MovieDB");
        db.create_collection("genres", CollectionOptions::new()).unwrap();
        let again = db.create_collection("genres", CollectionOptions::new());
        assert!(matches!(again, Err(MovieDbError::CollectionExists(_))));
    }

    #[test]
    fn test_create_collection_with_bad_validator_leaves_nothing() {
        let db = DatabaseCore::in_memory("MovieDB");
        let result = db.create_collection(
            "genres",
            CollectionOptions::new().with_validator(json!({"required": 5})),
        );
        assert!(result.is_err());
        assert!(!db.has_collection("genres"));
    }

    #[test]
    fn test_drop_collection() {
        let db = DatabaseCore::in_memory("MovieDB");
        db.collection("movies").unwrap();
        db.drop_collection("movies").unwrap();
        assert!(!db.has_collection("movies"));
        assert!(db.drop_collection("movies").is_err());
    }

    #[test]
    fn test_file_database_reopens_with_validator_and_indexes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movies.json");

        {
            let db = DatabaseCore::open("MovieDB", &path).unwrap();
            let genres = db
                .create_collection(
                    "genres",
                    CollectionOptions::new().with_validator(json!({"required": ["name"]})),
                )
                .unwrap();
            genres.create_index("name".to_string(), true).unwrap();
            genres
                .insert_one(json!({"name": "Drama"}).as_object().cloned().unwrap())
                .unwrap();
            db.flush().unwrap();
        }

        let db = DatabaseCore::open("MovieDB", &path).unwrap();
        let genres = db.collection("genres").unwrap();
        assert_eq!(genres.count_documents(&json!({})).unwrap(), 1);
        assert!(genres
            .insert_one(json!({"name": "Drama"}).as_object().cloned().unwrap())
            .is_err());
        assert!(genres.insert_one(serde_json::Map::new()).is_err());
    }
}
