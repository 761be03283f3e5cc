// moviedb-core/src/lib.rs
// Movie catalog over an embedded document store

pub mod catalog;
pub mod collection_core;
pub mod database;
pub mod document;
pub mod error;
pub mod find_options;
pub mod index;
pub mod query;
pub mod storage;

// Public exports
pub use catalog::{
    add_movie, initialize, log_movie_change, log_movie_change_by, Director, Genre, InsertOneResult, Movie,
    MovieAuditLog, MovieCatalog, MovieSnapshot, MovieUpdate, NewDirector, NewMovie, DATABASE_NAME,
};
pub use collection_core::{CollectionCore, InsertManyResult, UpdateResult};
pub use database::{CollectionOptions, DatabaseCore};
pub use document::{Date, Document, DocumentId, ObjectId};
pub use error::{MovieDbError, Result};
pub use find_options::FindOptions;
pub use query::Query;
pub use storage::{FileStorage, MemoryStorage, Storage};
