// moviedb-core/src/storage/mod.rs
//! Storage backends
//!
//! ```text
//! Storage trait (unified interface)
//!   ├── MemoryStorage (in-memory, tests and scratch databases)
//!   └── FileStorage   (MemoryStorage + JSON snapshot file)
//! ```

mod file_storage;
mod memory_storage;
mod traits;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::index::IndexMetadata;

pub use file_storage::FileStorage;
pub use memory_storage::MemoryStorage;
pub use traits::Storage;

/// Per-collection metadata kept alongside the documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionMeta {
    pub name: String,
    pub document_count: u64,
    /// `$jsonSchema` validator, if any
    #[serde(default)]
    pub schema: Option<Value>,
    /// Secondary indexes (the `_id` index is implicit)
    #[serde(default)]
    pub indexes: Vec<IndexMetadata>,
}

impl CollectionMeta {
    pub fn new(name: &str) -> Self {
        CollectionMeta {
            name: name.to_string(),
            document_count: 0,
            schema: None,
            indexes: Vec::new(),
        }
    }
}
