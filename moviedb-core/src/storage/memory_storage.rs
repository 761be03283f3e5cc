// moviedb-core/src/storage/memory_storage.rs
//! Pure in-memory storage
//!
//! Fast and ephemeral: data is lost when the storage is dropped. Also the
//! working set behind `FileStorage`, which snapshots it to disk.

use std::collections::BTreeMap;

use crate::document::{Document, DocumentId};
use crate::error::{MovieDbError, Result};
use crate::storage::{CollectionMeta, Storage};

#[derive(Debug, Clone)]
pub(crate) struct CollectionData {
    pub(crate) meta: CollectionMeta,
    pub(crate) documents: Vec<Document>,
}

impl CollectionData {
    fn position(&self, id: &DocumentId) -> Option<usize> {
        self.documents.iter().position(|doc| doc.id() == id)
    }
}

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct MemoryStorage {
    collections: BTreeMap<String, CollectionData>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_collections(collections: Vec<CollectionData>) -> Self {
        MemoryStorage {
            collections: collections
                .into_iter()
                .map(|data| (data.meta.name.clone(), data))
                .collect(),
        }
    }

    pub(crate) fn collections(&self) -> impl Iterator<Item = &CollectionData> {
        self.collections.values()
    }

    fn data(&self, collection: &str) -> Result<&CollectionData> {
        self.collections
            .get(collection)
            .ok_or_else(|| MovieDbError::CollectionNotFound(collection.to_string()))
    }

    fn data_mut(&mut self, collection: &str) -> Result<&mut CollectionData> {
        self.collections
            .get_mut(collection)
            .ok_or_else(|| MovieDbError::CollectionNotFound(collection.to_string()))
    }
}

impl Storage for MemoryStorage {
    fn insert_document(&mut self, collection: &str, doc: &Document) -> Result<()> {
        let data = self.data_mut(collection)?;
        if data.position(doc.id()).is_some() {
            return Err(MovieDbError::DuplicateKey {
                index: format!("{}_id", collection),
                key: doc.id().to_string(),
            });
        }
        data.documents.push(doc.clone());
        data.meta.document_count = data.documents.len() as u64;
        Ok(())
    }

    fn read_document(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>> {
        match self.collections.get(collection) {
            Some(data) => Ok(data.position(id).map(|pos| data.documents[pos].clone())),
            None => Ok(None),
        }
    }

    fn replace_document(&mut self, collection: &str, doc: &Document) -> Result<()> {
        let data = self.data_mut(collection)?;
        let pos = data
            .position(doc.id())
            .ok_or_else(|| MovieDbError::DocumentNotFound(doc.id().to_string()))?;
        data.documents[pos] = doc.clone();
        Ok(())
    }

    fn delete_document(&mut self, collection: &str, id: &DocumentId) -> Result<bool> {
        let data = self.data_mut(collection)?;
        match data.position(id) {
            Some(pos) => {
                data.documents.remove(pos);
                data.meta.document_count = data.documents.len() as u64;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn scan_documents(&self, collection: &str) -> Result<Vec<Document>> {
        Ok(self.data(collection)?.documents.clone())
    }

    fn create_collection(&mut self, name: &str) -> Result<()> {
        if self.collections.contains_key(name) {
            return Err(MovieDbError::CollectionExists(name.to_string()));
        }
        self.collections.insert(
            name.to_string(),
            CollectionData {
                meta: CollectionMeta::new(name),
                documents: Vec::new(),
            },
        );
        Ok(())
    }

    fn drop_collection(&mut self, name: &str) -> Result<()> {
        self.collections
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| MovieDbError::CollectionNotFound(name.to_string()))
    }

    fn list_collections(&self) -> Vec<String> {
        self.collections.keys().cloned().collect()
    }

    fn get_collection_meta(&self, name: &str) -> Option<&CollectionMeta> {
        self.collections.get(name).map(|data| &data.meta)
    }

    fn get_collection_meta_mut(&mut self, name: &str) -> Option<&mut CollectionMeta> {
        self.collections.get_mut(name).map(|data| &mut data.meta)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
