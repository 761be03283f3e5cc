// moviedb-core/src/catalog/mod.rs
//! Movie catalog on top of the document store.
//!
//! - `schema`: collections, validators and indexes of the `MovieDB` database
//! - `models`: typed records and helper inputs
//! - `procedures`: `add_movie` and `log_movie_change`
//! - `repository`: `MovieCatalog`, CRUD over all collections
//!
//! None of this validates anything itself: rejected writes come from the
//! collection validators and the unique index on `genres.name`.

pub mod models;
pub mod procedures;
pub mod repository;
pub mod schema;

pub use models::{
    Director, Genre, Movie, MovieAuditLog, MovieSnapshot, MovieUpdate, NewDirector, NewMovie,
};
pub use procedures::{
    add_movie, log_movie_change, log_movie_change_by, InsertOneResult, UPDATE_ACTION,
};
pub use repository::MovieCatalog;
pub use schema::{initialize, DATABASE_NAME, DIRECTORS, GENRES, MOVIES, MOVIE_AUDIT_LOGS};
