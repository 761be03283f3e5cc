// moviedb-core/src/storage/traits.rs
//! Storage abstraction
//!
//! Collections and the database only talk to this trait, so the backend is
//! injected: `MemoryStorage` in tests, `FileStorage` for persistent catalogs.

use crate::document::{Document, DocumentId};
use crate::error::Result;
use crate::storage::CollectionMeta;

/// Core storage abstraction
///
/// Storage keeps documents in insertion order and does not validate them;
/// schema and index checks happen in `CollectionCore` before any call here.
pub trait Storage: Send + Sync {
    // ========================================================================
    // DOCUMENT OPERATIONS
    // ========================================================================

    /// Append a new document. Fails with `DuplicateKey` if the id is taken.
    fn insert_document(&mut self, collection: &str, doc: &Document) -> Result<()>;

    /// Read a document by its id
    fn read_document(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>>;

    /// Replace the stored document carrying the same id, keeping its position
    fn replace_document(&mut self, collection: &str, doc: &Document) -> Result<()>;

    /// Remove a document. Returns false if there was nothing to remove.
    fn delete_document(&mut self, collection: &str, id: &DocumentId) -> Result<bool>;

    /// All documents of a collection in insertion order
    fn scan_documents(&self, collection: &str) -> Result<Vec<Document>>;

    // ========================================================================
    // COLLECTION MANAGEMENT
    // ========================================================================

    fn create_collection(&mut self, name: &str) -> Result<()>;

    fn drop_collection(&mut self, name: &str) -> Result<()>;

    /// Collection names, sorted
    fn list_collections(&self) -> Vec<String>;

    // ========================================================================
    // METADATA ACCESS
    // ========================================================================

    fn get_collection_meta(&self, name: &str) -> Option<&CollectionMeta>;

    fn get_collection_meta_mut(&mut self, name: &str) -> Option<&mut CollectionMeta>;

    // ========================================================================
    // PERSISTENCE & FLUSHING
    // ========================================================================

    /// Persist pending changes. No-op for memory storage.
    fn flush(&mut self) -> Result<()>;
}
