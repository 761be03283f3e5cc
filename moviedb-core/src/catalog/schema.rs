// moviedb-core/src/catalog/schema.rs
// Collections, validators and indexes of the movie catalog

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::collection_core::CollectionCore;
use crate::database::{CollectionOptions, DatabaseCore};
use crate::error::Result;
use crate::storage::Storage;

pub const DATABASE_NAME: &str = "MovieDB";

pub const DIRECTORS: &str = "directors";
pub const MOVIES: &str = "movies";
pub const GENRES: &str = "genres";
pub const MOVIE_AUDIT_LOGS: &str = "movie_audit_logs";

/// Every collection of the catalog, in creation order
pub const COLLECTIONS: [&str; 4] = [DIRECTORS, MOVIES, GENRES, MOVIE_AUDIT_LOGS];

/// Single-field ascending index declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub collection: &'static str,
    pub field: &'static str,
    pub unique: bool,
}

pub const INDEXES: [IndexSpec; 5] = [
    IndexSpec { collection: MOVIES, field: "title", unique: false },
    IndexSpec { collection: MOVIES, field: "year", unique: false },
    IndexSpec { collection: MOVIES, field: "score", unique: false },
    IndexSpec { collection: DIRECTORS, field: "name", unique: false },
    IndexSpec { collection: GENRES, field: "name", unique: true },
];

pub fn director_validator() -> Value {
    json!({
        "$jsonSchema": {
            "bsonType": "object",
            "required": ["name"],
            "properties": {
                "name": { "bsonType": "string" },
                "birth_date": { "bsonType": "date" },
                "nationality": { "bsonType": "string" }
            }
        }
    })
}

pub fn movie_validator() -> Value {
    json!({
        "$jsonSchema": {
            "bsonType": "object",
            "required": ["title"],
            "properties": {
                "title": { "bsonType": "string" },
                "year": { "bsonType": "int" },
                "score": { "bsonType": "double" },
                "metascore": { "bsonType": "int" },
                "votes": { "bsonType": "int" },
                "director_id": { "bsonType": "objectId" },
                "runtime": { "bsonType": "int" },
                "revenue": { "bsonType": "double" },
                "description": { "bsonType": "string" },
                "genres": {
                    "bsonType": "array",
                    "items": { "bsonType": "objectId" }
                },
                "created_at": { "bsonType": "date" },
                "updated_at": { "bsonType": "date" }
            }
        }
    })
}

pub fn genre_validator() -> Value {
    json!({
        "$jsonSchema": {
            "bsonType": "object",
            "required": ["name"],
            "properties": {
                "name": { "bsonType": "string" }
            }
        }
    })
}

/// Validator declared for a catalog collection. `movie_audit_logs` has none.
pub fn validator_for(collection: &str) -> Option<Value> {
    match collection {
        DIRECTORS => Some(director_validator()),
        MOVIES => Some(movie_validator()),
        GENRES => Some(genre_validator()),
        _ => None,
    }
}

/// Create whatever part of the catalog is missing.
///
/// Missing collections are created with their validator, existing ones get
/// their validator reapplied if it drifted, missing indexes are built. A
/// second call changes nothing.
pub fn initialize<S: Storage>(db: &DatabaseCore<S>) -> Result<()> {
    for name in COLLECTIONS {
        let validator = validator_for(name);
        if !db.has_collection(name) {
            let mut options = CollectionOptions::new();
            if let Some(v) = validator {
                options = options.with_validator(v);
            }
            db.create_collection(name, options)?;
            continue;
        }

        let collection = db.collection(name)?;
        if collection.schema() != validator {
            debug!("Reapplying validator on '{}'", name);
            collection.set_schema(validator)?;
        }
    }

    for spec in INDEXES {
        let collection = db.collection(spec.collection)?;
        let existing = collection
            .index_metadata()
            .into_iter()
            .find(|meta| meta.field == spec.field);

        match existing {
            Some(meta) if meta.unique != spec.unique => {
                rebuild_index(&collection, &meta.name, spec)?;
            }
            Some(_) => {}
            None => {
                collection.create_index(spec.field.to_string(), spec.unique)?;
            }
        }
    }

    info!("Catalog '{}' initialized", db.name());
    Ok(())
}

/// Replace an index whose uniqueness differs from the declaration.
/// If existing documents violate the declared uniqueness the old index is
/// restored and the violation returned.
fn rebuild_index<S: Storage>(
    collection: &CollectionCore<S>,
    existing_name: &str,
    spec: IndexSpec,
) -> Result<()> {
    warn!(
        "Rebuilding index '{}' on '{}' with unique={}",
        existing_name, collection.name, spec.unique
    );
    collection.drop_index(existing_name)?;
    if let Err(e) = collection.create_index(spec.field.to_string(), spec.unique) {
        collection.create_index(spec.field.to_string(), !spec.unique)?;
        return Err(e);
    }
    Ok(())
}
