// moviedb-core/src/find_options.rs
// Find query options: sort, limit, skip

use std::cmp::Ordering;

use crate::document::Document;
use crate::index::IndexKey;

/// Options for find queries
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Sort: [(field, direction)], direction: 1 (asc) or -1 (desc)
    pub sort: Option<Vec<(String, i32)>>,

    /// Limit: maximum number of documents to return
    pub limit: Option<usize>,

    /// Skip: number of documents to skip (for pagination)
    pub skip: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sort(mut self, sort: Vec<(String, i32)>) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sort, then skip, then limit
    pub fn apply(&self, mut docs: Vec<Document>) -> Vec<Document> {
        if let Some(sort) = &self.sort {
            docs.sort_by(|a, b| compare_documents(a, b, sort));
        }

        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(usize::MAX);
        docs.into_iter().skip(skip).take(limit).collect()
    }
}

/// Compare two documents on the sort spec; missing fields sort as null
fn compare_documents(a: &Document, b: &Document, sort: &[(String, i32)]) -> Ordering {
    for (field, direction) in sort {
        let ka = a.get(field).map(IndexKey::from).unwrap_or(IndexKey::Null);
        let kb = b.get(field).map(IndexKey::from).unwrap_or(IndexKey::Null);
        let ordering = if *direction < 0 { kb.cmp(&ka) } else { ka.cmp(&kb) };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
