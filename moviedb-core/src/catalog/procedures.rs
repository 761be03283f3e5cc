// moviedb-core/src/catalog/procedures.rs
// add_movie and log_movie_change

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::models::{to_fields, MovieAuditLog, MovieSnapshot, NewMovie};
use crate::catalog::schema::{MOVIES, MOVIE_AUDIT_LOGS};
use crate::database::DatabaseCore;
use crate::document::{Date, DocumentId, ObjectId};
use crate::error::Result;
use crate::storage::Storage;

/// `action_type` of every audit entry written by `log_movie_change`
pub const UPDATE_ACTION: &str = "UPDATE";

/// Identifier assigned to a freshly inserted document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOneResult {
    pub inserted_id: DocumentId,
}

/// Movie document as written by `add_movie`
#[derive(Serialize)]
struct MovieRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metascore: Option<i32>,
    votes: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    director_id: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    runtime: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revenue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    genres: &'a [ObjectId],
    created_at: Date,
    updated_at: Date,
}

/// Insert a movie built from `movie`.
///
/// Missing votes become 0, missing genre ids an empty list, and both
/// timestamps get the same instant. Validation and index failures from the
/// store are returned as is.
pub fn add_movie<S: Storage>(db: &DatabaseCore<S>, movie: &NewMovie) -> Result<InsertOneResult> {
    let now = Date::now();
    let record = MovieRecord {
        title: movie.title.as_deref(),
        year: movie.year,
        score: movie.score,
        metascore: movie.metascore,
        votes: movie.votes.unwrap_or(0),
        director_id: movie.director_id,
        runtime: movie.runtime,
        revenue: movie.revenue,
        description: movie.description.as_deref(),
        genres: movie.genre_ids.as_deref().unwrap_or(&[]),
        created_at: now,
        updated_at: now,
    };

    let inserted_id = db.collection(MOVIES)?.insert_one(to_fields(&record)?)?;
    debug!("Added movie {}", inserted_id);
    Ok(InsertOneResult { inserted_id })
}

/// Record a title or score change of a movie.
///
/// Writes one audit entry when either field differs between `old` and `new`
/// and returns its id; returns `None` without writing otherwise.
pub fn log_movie_change<S: Storage>(
    db: &DatabaseCore<S>,
    movie_id: &DocumentId,
    old: &MovieSnapshot,
    new: &MovieSnapshot,
) -> Result<Option<InsertOneResult>> {
    log_movie_change_by(db, movie_id, old, new, None)
}

/// `log_movie_change` recording who made the change in `user_name`
pub fn log_movie_change_by<S: Storage>(
    db: &DatabaseCore<S>,
    movie_id: &DocumentId,
    old: &MovieSnapshot,
    new: &MovieSnapshot,
    user_name: Option<&str>,
) -> Result<Option<InsertOneResult>> {
    if old.title == new.title && old.score == new.score {
        return Ok(None);
    }

    let entry = MovieAuditLog {
        id: None,
        movie_id: movie_id.clone(),
        action_type: UPDATE_ACTION.to_string(),
        action_timestamp: Date::now(),
        old_title: old.title.clone(),
        new_title: new.title.clone(),
        old_score: old.score,
        new_score: new.score,
        user_name: user_name.map(str::to_string),
    };

    let inserted_id = db
        .collection(MOVIE_AUDIT_LOGS)?
        .insert_one(to_fields(&entry)?)?;
    debug!("Logged change of movie {} as {}", movie_id, inserted_id);
    Ok(Some(InsertOneResult { inserted_id }))
}
