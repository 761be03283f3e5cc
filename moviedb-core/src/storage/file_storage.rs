// moviedb-core/src/storage/file_storage.rs
//! File-backed storage
//!
//! ```text
//! FileStorage
//!      ↓
//! MemoryStorage (working set)
//!      ↓ flush: write <path>.tmp, rename over <path>
//! JSON snapshot file
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::memory_storage::CollectionData;
use crate::document::{Document, DocumentId};
use crate::error::{MovieDbError, Result};
use crate::storage::{CollectionMeta, MemoryStorage, Storage};

const FORMAT_TAG: &str = "moviedb/1";

#[derive(Serialize, Deserialize)]
struct Snapshot {
    format: String,
    collections: Vec<CollectionSnapshot>,
}

#[derive(Serialize, Deserialize)]
struct CollectionSnapshot {
    meta: CollectionMeta,
    documents: Vec<Value>,
}

/// Persistent storage backend
///
/// Changes are kept in memory and written on `flush()` or when dropped.
pub struct FileStorage {
    path: PathBuf,
    inner: MemoryStorage,
    dirty: bool,
}

impl FileStorage {
    /// Open an existing snapshot or start an empty one at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = if path.exists() {
            Self::load(&path)?
        } else {
            debug!("Creating new database file at {}", path.display());
            MemoryStorage::new()
        };

        Ok(FileStorage {
            path,
            inner,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<MemoryStorage> {
        let content = fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .map_err(|e| MovieDbError::Corruption(format!("{}: {}", path.display(), e)))?;

        if snapshot.format != FORMAT_TAG {
            return Err(MovieDbError::Corruption(format!(
                "{}: unsupported format '{}'",
                path.display(),
                snapshot.format
            )));
        }

        let mut collections = Vec::with_capacity(snapshot.collections.len());
        for coll in snapshot.collections {
            let documents = coll
                .documents
                .into_iter()
                .map(Document::from_value)
                .collect::<Result<Vec<_>>>()?;
            collections.push(CollectionData {
                meta: coll.meta,
                documents,
            });
        }

        debug!(
            "Loaded {} collections from {}",
            collections.len(),
            path.display()
        );
        Ok(MemoryStorage::from_collections(collections))
    }

    fn write_snapshot(&self) -> Result<()> {
        let snapshot = Snapshot {
            format: FORMAT_TAG.to_string(),
            collections: self
                .inner
                .collections()
                .map(|data| CollectionSnapshot {
                    meta: data.meta.clone(),
                    documents: data.documents.iter().map(Document::to_value).collect(),
                })
                .collect(),
        };

        let json = serde_json::to_vec_pretty(&snapshot)?;
        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn insert_document(&mut self, collection: &str, doc: &Document) -> Result<()> {
        self.inner.insert_document(collection, doc)?;
        self.dirty = true;
        Ok(())
    }

    fn read_document(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>> {
        self.inner.read_document(collection, id)
    }

    fn replace_document(&mut self, collection: &str, doc: &Document) -> Result<()> {
        self.inner.replace_document(collection, doc)?;
        self.dirty = true;
        Ok(())
    }

    fn delete_document(&mut self, collection: &str, id: &DocumentId) -> Result<bool> {
        let removed = self.inner.delete_document(collection, id)?;
        self.dirty |= removed;
        Ok(removed)
    }

    fn scan_documents(&self, collection: &str) -> Result<Vec<Document>> {
        self.inner.scan_documents(collection)
    }

    fn create_collection(&mut self, name: &str) -> Result<()> {
        self.inner.create_collection(name)?;
        self.dirty = true;
        Ok(())
    }

    fn drop_collection(&mut self, name: &str) -> Result<()> {
        self.inner.drop_collection(name)?;
        self.dirty = true;
        Ok(())
    }

    fn list_collections(&self) -> Vec<String> {
        self.inner.list_collections()
    }

    fn get_collection_meta(&self, name: &str) -> Option<&CollectionMeta> {
        self.inner.get_collection_meta(name)
    }

    fn get_collection_meta_mut(&mut self, name: &str) -> Option<&mut CollectionMeta> {
        self.dirty = true;
        self.inner.get_collection_meta_mut(name)
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.write_snapshot()?;
        self.dirty = false;
        debug!("Flushed database to {}", self.path.display());
        Ok(())
    }
}

impl Drop for FileStorage {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to flush {} on close: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use tempfile::TempDir;

    fn doc(id: i64, name: &str) -> Document {
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!(name));
        Document::new(DocumentId::Int(id), fields)
    }

    #[test]
    fn test_open_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path().join("movies.json")).unwrap();
        assert!(storage.list_collections().is_empty());
    }

    #[test]
    fn test_flush_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movies.json");

        {
            let mut storage = FileStorage::open(&path).unwrap();
            storage.create_collection("genres").unwrap();
            storage.insert_document("genres", &doc(1, "Drama")).unwrap();
            storage.insert_document("genres", &doc(2, "Comedy")).unwrap();
            storage.flush().unwrap();
        }

        let storage = FileStorage::open(&path).unwrap();
        let docs = storage.scan_documents("genres").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].get("name"), Some(&json!("Drama")));
        assert_eq!(storage.get_collection_meta("genres").unwrap().document_count, 2);
    }

    #[test]
    fn test_drop_flushes_pending_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movies.json");

        {
            let mut storage = FileStorage::open(&path).unwrap();
            storage.create_collection("directors").unwrap();
        }

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.list_collections(), vec!["directors"]);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movies.json");
        let mut storage = FileStorage::open(&path).unwrap();
        storage.create_collection("genres").unwrap();
        storage.flush().unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("movies.json.tmp").exists());
    }

    #[test]
    fn test_corrupted_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movies.json");
        fs::write(&path, "not a snapshot").unwrap();

        let result = FileStorage::open(&path);
        assert!(matches!(result, Err(MovieDbError::Corruption(_))));
    }

    #[test]
    fn test_unknown_format_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movies.json");
        fs::write(&path, r#"{"format": "other/9", "collections": []}"#).unwrap();

        let result = FileStorage::open(&path);
        assert!(matches!(result, Err(MovieDbError::Corruption(_))));
    }
}
