// moviedb-core/src/catalog/repository.rs
// CRUD over the catalog collections

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::catalog::models::{
    to_fields, Director, Genre, Movie, MovieAuditLog, MovieSnapshot, MovieUpdate, NewDirector,
    NewMovie,
};
use crate::catalog::procedures::{self, InsertOneResult};
use crate::catalog::schema::{self, DIRECTORS, GENRES, MOVIES, MOVIE_AUDIT_LOGS};
use crate::database::DatabaseCore;
use crate::document::{Date, DocumentId, ID_FIELD};
use crate::error::{MovieDbError, Result};
use crate::find_options::FindOptions;
use crate::storage::Storage;

/// Movie catalog over an injected database handle
///
/// Audit entries it writes carry the acting user set with `with_user`.
pub struct MovieCatalog<'a, S: Storage> {
    db: &'a DatabaseCore<S>,
    user_name: Option<String>,
}

fn by_id(id: &DocumentId) -> Value {
    json!({ ID_FIELD: id.to_value() })
}

fn not_found(collection: &str, id: &DocumentId) -> MovieDbError {
    MovieDbError::DocumentNotFound(format!("{} in '{}'", id, collection))
}

impl<'a, S: Storage> MovieCatalog<'a, S> {
    pub fn new(db: &'a DatabaseCore<S>) -> Self {
        MovieCatalog { db, user_name: None }
    }

    pub fn with_user(mut self, user_name: &str) -> Self {
        self.user_name = Some(user_name.to_string());
        self
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn database(&self) -> &DatabaseCore<S> {
        self.db
    }

    /// Create missing collections, validators and indexes
    pub fn initialize(&self) -> Result<()> {
        schema::initialize(self.db)
    }

    // ========== GENERIC HELPERS ==========

    fn get<T: DeserializeOwned>(&self, collection: &str, id: &DocumentId) -> Result<T> {
        self.db
            .collection(collection)?
            .find_by_id(id)?
            .ok_or_else(|| not_found(collection, id))?
            .into_record()
    }

    fn list<T: DeserializeOwned>(&self, collection: &str, options: &FindOptions) -> Result<Vec<T>> {
        self.db
            .collection(collection)?
            .find_with_options(&json!({}), options)?
            .into_iter()
            .map(|doc| doc.into_record())
            .collect()
    }

    /// `$set` the given fields and `$unset` the listed ones on one document
    fn modify(
        &self,
        collection: &str,
        id: &DocumentId,
        set: Map<String, Value>,
        unset: &[&str],
    ) -> Result<()> {
        let mut update = Map::new();
        if !set.is_empty() {
            update.insert("$set".to_string(), Value::Object(set));
        }
        if !unset.is_empty() {
            let fields = unset.iter().map(|f| (f.to_string(), json!(""))).collect();
            update.insert("$unset".to_string(), Value::Object(fields));
        }

        let coll = self.db.collection(collection)?;
        if update.is_empty() {
            return match coll.find_by_id(id)? {
                Some(_) => Ok(()),
                None => Err(not_found(collection, id)),
            };
        }

        let result = coll.update_one(&by_id(id), &Value::Object(update))?;
        if result.matched_count == 0 {
            return Err(not_found(collection, id));
        }
        Ok(())
    }

    fn delete(&self, collection: &str, id: &DocumentId) -> Result<()> {
        if self.db.collection(collection)?.delete_one(&by_id(id))? == 0 {
            return Err(not_found(collection, id));
        }
        debug!("Deleted {} from '{}'", id, collection);
        Ok(())
    }

    // ========== DIRECTORS ==========

    pub fn create_director(&self, director: &NewDirector) -> Result<DocumentId> {
        self.db.collection(DIRECTORS)?.insert_one(to_fields(director)?)
    }

    pub fn get_director(&self, id: &DocumentId) -> Result<Director> {
        self.get(DIRECTORS, id)
    }

    pub fn list_directors(&self) -> Result<Vec<Director>> {
        self.list(DIRECTORS, &FindOptions::new())
    }

    /// Replace all fields of a director; fields left `None` are removed
    pub fn update_director(&self, id: &DocumentId, director: &NewDirector) -> Result<Director> {
        let mut unset = Vec::new();
        if director.name.is_none() {
            unset.push("name");
        }
        if director.birth_date.is_none() {
            unset.push("birth_date");
        }
        if director.nationality.is_none() {
            unset.push("nationality");
        }
        self.modify(DIRECTORS, id, to_fields(director)?, &unset)?;
        self.get_director(id)
    }

    pub fn delete_director(&self, id: &DocumentId) -> Result<()> {
        self.delete(DIRECTORS, id)
    }

    // ========== GENRES ==========

    pub fn create_genre(&self, name: &str) -> Result<DocumentId> {
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!(name));
        self.db.collection(GENRES)?.insert_one(fields)
    }

    pub fn get_genre(&self, id: &DocumentId) -> Result<Genre> {
        self.get(GENRES, id)
    }

    pub fn list_genres(&self) -> Result<Vec<Genre>> {
        self.list(GENRES, &FindOptions::new())
    }

    pub fn update_genre(&self, id: &DocumentId, name: &str) -> Result<Genre> {
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!(name));
        self.modify(GENRES, id, fields, &[])?;
        self.get_genre(id)
    }

    pub fn delete_genre(&self, id: &DocumentId) -> Result<()> {
        self.delete(GENRES, id)
    }

    // ========== MOVIES ==========

    pub fn add_movie(&self, movie: &NewMovie) -> Result<InsertOneResult> {
        procedures::add_movie(self.db, movie)
    }

    pub fn get_movie(&self, id: &DocumentId) -> Result<Movie> {
        self.get(MOVIES, id)
    }

    pub fn list_movies(&self, options: &FindOptions) -> Result<Vec<Movie>> {
        self.list(MOVIES, options)
    }

    /// Apply the provided fields, refresh `updated_at`, then log a title or
    /// score change.
    pub fn update_movie(&self, id: &DocumentId, update: &MovieUpdate) -> Result<Movie> {
        let before = self.get_movie(id)?;

        let mut fields = update.to_fields()?;
        fields.insert("updated_at".to_string(), serde_json::to_value(Date::now())?);
        self.modify(MOVIES, id, fields, &[])?;

        let after = self.get_movie(id)?;
        self.log_movie_change(id, &MovieSnapshot::from(&before), &MovieSnapshot::from(&after))?;
        Ok(after)
    }

    pub fn delete_movie(&self, id: &DocumentId) -> Result<()> {
        self.delete(MOVIES, id)
    }

    // ========== AUDIT ==========

    pub fn log_movie_change(
        &self,
        movie_id: &DocumentId,
        old: &MovieSnapshot,
        new: &MovieSnapshot,
    ) -> Result<Option<InsertOneResult>> {
        procedures::log_movie_change_by(self.db, movie_id, old, new, self.user_name())
    }

    /// Audit entries of one movie, oldest first
    pub fn audit_log_for(&self, movie_id: &DocumentId) -> Result<Vec<MovieAuditLog>> {
        let options = FindOptions::new().with_sort(vec![("action_timestamp".to_string(), 1)]);
        self.db
            .collection(MOVIE_AUDIT_LOGS)?
            .find_with_options(&json!({ "movie_id": movie_id.to_value() }), &options)?
            .into_iter()
            .map(|doc| doc.into_record())
            .collect()
    }
}
