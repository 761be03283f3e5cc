// moviedb-core/src/catalog/models.rs
// Typed records of the movie catalog
//
// Optional fields are skipped when absent, so typed validators only ever
// see the fields a record actually carries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{Date, DocumentId, ObjectId};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Director {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metascore: Option<i32>,
    #[serde(default)]
    pub votes: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub genres: Vec<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Date>,
}

/// One entry of `movie_audit_logs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieAuditLog {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    pub movie_id: DocumentId,
    pub action_type: String,
    pub action_timestamp: Date,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

/// Input of `add_movie`. Every field may be missing; the validator decides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewMovie {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub score: Option<f64>,
    pub metascore: Option<i32>,
    pub votes: Option<i32>,
    pub director_id: Option<ObjectId>,
    pub runtime: Option<i32>,
    pub revenue: Option<f64>,
    pub description: Option<String>,
    pub genre_ids: Option<Vec<ObjectId>>,
}

/// Input of `create_director` and `update_director`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewDirector {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
}

impl NewDirector {
    pub fn named(name: &str) -> Self {
        NewDirector {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }
}

/// The fields `log_movie_change` compares
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieSnapshot {
    pub title: Option<String>,
    pub score: Option<f64>,
}

impl MovieSnapshot {
    pub fn new(title: Option<&str>, score: Option<f64>) -> Self {
        MovieSnapshot {
            title: title.map(str::to_string),
            score,
        }
    }
}

impl From<&Movie> for MovieSnapshot {
    fn from(movie: &Movie) -> Self {
        MovieSnapshot {
            title: Some(movie.title.clone()),
            score: movie.score,
        }
    }
}

/// Partial movie update: only `Some` fields are written
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metascore: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votes: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director_id: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "genres", skip_serializing_if = "Option::is_none")]
    pub genre_ids: Option<Vec<ObjectId>>,
}

impl MovieUpdate {
    /// Provided fields as a `$set` body
    pub fn to_fields(&self) -> Result<Map<String, Value>> {
        to_fields(self)
    }

    pub fn is_empty(&self) -> bool {
        *self == MovieUpdate::default()
    }
}

/// Serialize a record into document fields
pub(crate) fn to_fields<T: Serialize>(record: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(crate::error::MovieDbError::Serialization(format!(
            "Expected an object, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_fields_are_omitted() {
        let director = Director {
            id: None,
            name: "Sofia Coppola".to_string(),
            birth_date: None,
            nationality: None,
        };
        assert_eq!(to_fields(&director).unwrap(), json!({"name": "Sofia Coppola"}).as_object().cloned().unwrap());
    }

    #[test]
    fn test_movie_reads_defaults() {
        let movie: Movie = serde_json::from_value(json!({"title": "Heat"})).unwrap();
        assert_eq!(movie.votes, 0);
        assert!(movie.genres.is_empty());
        assert!(movie.id.is_none());
    }

    #[test]
    fn test_movie_update_fields() {
        let genre = ObjectId::new();
        let update = MovieUpdate {
            score: Some(7.5),
            genre_ids: Some(vec![genre]),
            ..Default::default()
        };
        let fields = update.to_fields().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["score"], json!(7.5));
        assert_eq!(fields["genres"], json!([{"$oid": genre.to_hex()}]));
        assert!(MovieUpdate::default().is_empty());
        assert!(!update.is_empty());
    }

    #[test]
    fn test_snapshot_from_movie() {
        let movie: Movie = serde_json::from_value(json!({"title": "Heat", "score": 8.3})).unwrap();
        assert_eq!(MovieSnapshot::from(&movie), MovieSnapshot::new(Some("Heat"), Some(8.3)));
    }
}
