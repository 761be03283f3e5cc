//! Integration tests for the movie catalog
//!
//! Validation and uniqueness contracts of the initialized `MovieDB`, plus the
//! two helper routines.

use moviedb_core::catalog::schema::{DIRECTORS, GENRES, MOVIES, MOVIE_AUDIT_LOGS};
use moviedb_core::{
    add_movie, initialize, log_movie_change, DatabaseCore, DocumentId, MemoryStorage, Movie,
    MovieAuditLog, MovieCatalog, MovieDbError, MovieSnapshot, MovieUpdate, NewDirector, NewMovie,
    ObjectId, DATABASE_NAME,
};
use serde_json::{json, Map, Value};

fn create_catalog_db() -> DatabaseCore<MemoryStorage> {
    let db = DatabaseCore::in_memory(DATABASE_NAME);
    initialize(&db).unwrap();
    db
}

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn count(db: &DatabaseCore<MemoryStorage>, collection: &str) -> u64 {
    db.collection(collection)
        .unwrap()
        .count_documents(&json!({}))
        .unwrap()
}

// ========== VALIDATION CONTRACT ==========

#[test]
fn test_duplicate_genre_name_is_rejected() {
    let db = create_catalog_db();
    let genres = db.collection(GENRES).unwrap();

    genres.insert_one(fields(json!({"name": "Drama"}))).unwrap();
    let err = genres.insert_one(fields(json!({"name": "Drama"}))).unwrap_err();

    assert!(matches!(err, MovieDbError::DuplicateKey { .. }));
    assert_eq!(count(&db, GENRES), 1);
}

#[test]
fn test_missing_required_field_is_rejected() {
    let db = create_catalog_db();

    for collection in [MOVIES, DIRECTORS, GENRES] {
        let err = db
            .collection(collection)
            .unwrap()
            .insert_one(fields(json!({"description": "nameless"})))
            .unwrap_err();
        assert!(
            matches!(err, MovieDbError::SchemaError(_)),
            "{} accepted a record without its required field",
            collection
        );
        assert_eq!(count(&db, collection), 0);
    }
}

#[test]
fn test_wrong_field_kind_is_rejected() {
    let db = create_catalog_db();
    let movies = db.collection(MOVIES).unwrap();

    let bad = [
        json!({"title": "Heat", "year": "1995"}),
        json!({"title": "Heat", "year": 1995.5}),
        json!({"title": "Heat", "score": 8}),
        json!({"title": "Heat", "director_id": "not-an-oid"}),
        json!({"title": "Heat", "director_id": {"$oid": "ABCDEF0123456789ABCDEF01"}}),
        json!({"title": "Heat", "director_id": {"$oid": "+0+0+0+0+0+0+0+0+0+0+0+0"}}),
        json!({"title": "Heat", "genres": ["Drama"]}),
        json!({"title": "Heat", "created_at": "2020-01-01"}),
        json!({"title": 42}),
    ];
    for doc in bad {
        assert!(
            matches!(movies.insert_one(fields(doc.clone())), Err(MovieDbError::SchemaError(_))),
            "accepted {}",
            doc
        );
    }
    assert_eq!(count(&db, MOVIES), 0);

    let directors = db.collection(DIRECTORS).unwrap();
    assert!(directors
        .insert_one(fields(json!({"name": "Lynch", "birth_date": "1946-01-20"})))
        .is_err());
    assert!(directors
        .insert_one(fields(json!({"name": "Lynch", "birth_date": {"$date": "1946-01-20T00:00:00.000Z"}})))
        .is_ok());
}

#[test]
fn test_audit_logs_accept_anything() {
    let db = create_catalog_db();
    db.collection(MOVIE_AUDIT_LOGS)
        .unwrap()
        .insert_one(fields(json!({"free": "form"})))
        .unwrap();
    assert_eq!(count(&db, MOVIE_AUDIT_LOGS), 1);
}

#[test]
fn test_rejected_write_leaves_no_index_entry() {
    let db = create_catalog_db();
    let movies = db.collection(MOVIES).unwrap();

    assert!(movies
        .insert_one(fields(json!({"title": "Ghost", "year": "nope"})))
        .is_err());
    assert_eq!(movies.index_size("movies_title"), Some(0));
    assert!(movies.find(&json!({"title": "Ghost"})).unwrap().is_empty());
}

// ========== add_movie ==========

#[test]
fn test_add_movie_fills_defaults() {
    let db = create_catalog_db();
    let result = add_movie(
        &db,
        &NewMovie {
            title: Some("X".to_string()),
            year: Some(2020),
            ..Default::default()
        },
    )
    .unwrap();

    let movie: Movie = db
        .collection(MOVIES)
        .unwrap()
        .find_by_id(&result.inserted_id)
        .unwrap()
        .unwrap()
        .into_record()
        .unwrap();

    assert_eq!(movie.title, "X");
    assert_eq!(movie.year, Some(2020));
    assert_eq!(movie.votes, 0);
    assert!(movie.genres.is_empty());
    assert!(movie.created_at.is_some());
    assert_eq!(movie.created_at, movie.updated_at);
}

#[test]
fn test_add_movie_keeps_votes_and_genre_order() {
    let db = create_catalog_db();
    let g1 = ObjectId::new();
    let g2 = ObjectId::new();

    let result = add_movie(
        &db,
        &NewMovie {
            title: Some("X".to_string()),
            votes: Some(5),
            genre_ids: Some(vec![g2, g1]),
            ..Default::default()
        },
    )
    .unwrap();

    let stored = db
        .collection(MOVIES)
        .unwrap()
        .find_by_id(&result.inserted_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("votes"), Some(&json!(5)));
    assert_eq!(
        stored.get("genres"),
        Some(&json!([{"$oid": g2.to_hex()}, {"$oid": g1.to_hex()}]))
    );
}

#[test]
fn test_add_movie_is_found_through_indexes() {
    let db = create_catalog_db();
    add_movie(
        &db,
        &NewMovie {
            title: Some("Alien".to_string()),
            year: Some(1979),
            score: Some(8.5),
            ..Default::default()
        },
    )
    .unwrap();

    let movies = db.collection(MOVIES).unwrap();
    assert_eq!(movies.find(&json!({"title": "Alien"})).unwrap().len(), 1);
    assert_eq!(movies.find(&json!({"year": 1979})).unwrap().len(), 1);
    assert_eq!(movies.find(&json!({"score": {"$gte": 8.0}})).unwrap().len(), 1);
    assert_eq!(movies.index_size("movies_year"), Some(1));
}

#[test]
fn test_add_movie_propagates_validation_failure() {
    let db = create_catalog_db();
    let err = add_movie(&db, &NewMovie::default()).unwrap_err();
    assert!(matches!(err, MovieDbError::SchemaError(_)));
    assert_eq!(count(&db, MOVIES), 0);
}

// ========== log_movie_change ==========

#[test]
fn test_log_movie_change_unchanged_writes_nothing() {
    let db = create_catalog_db();
    let id = DocumentId::new_object_id();
    let snapshot = MovieSnapshot::new(Some("A"), Some(5.0));

    let result = log_movie_change(&db, &id, &snapshot, &snapshot.clone()).unwrap();
    assert!(result.is_none());
    assert_eq!(count(&db, MOVIE_AUDIT_LOGS), 0);
}

#[test]
fn test_log_movie_change_title_change_writes_one_entry() {
    let db = create_catalog_db();
    let id = DocumentId::new_object_id();

    let result = log_movie_change(
        &db,
        &id,
        &MovieSnapshot::new(Some("A"), Some(5.0)),
        &MovieSnapshot::new(Some("B"), Some(5.0)),
    )
    .unwrap();
    assert!(result.is_some());
    assert_eq!(count(&db, MOVIE_AUDIT_LOGS), 1);

    let entry: MovieAuditLog = db
        .collection(MOVIE_AUDIT_LOGS)
        .unwrap()
        .find_one(&json!({}))
        .unwrap()
        .unwrap()
        .into_record()
        .unwrap();
    assert_eq!(entry.movie_id, id);
    assert_eq!(entry.old_title.as_deref(), Some("A"));
    assert_eq!(entry.new_title.as_deref(), Some("B"));
    assert_eq!(entry.old_score, Some(5.0));
    assert_eq!(entry.new_score, Some(5.0));
    assert_eq!(entry.action_type, "UPDATE");
}

// ========== CATALOG CRUD ==========

#[test]
fn test_catalog_end_to_end() {
    let db = create_catalog_db();
    let catalog = MovieCatalog::new(&db);

    let director = catalog
        .create_director(&NewDirector::named("Michael Mann"))
        .unwrap();
    let crime = catalog.create_genre("Crime").unwrap();
    let thriller = catalog.create_genre("Thriller").unwrap();

    let movie_id = catalog
        .add_movie(&NewMovie {
            title: Some("Heat".to_string()),
            year: Some(1995),
            score: Some(8.3),
            director_id: director.as_object_id(),
            genre_ids: Some(vec![
                crime.as_object_id().unwrap(),
                thriller.as_object_id().unwrap(),
            ]),
            ..Default::default()
        })
        .unwrap()
        .inserted_id;

    let updated = catalog
        .update_movie(
            &movie_id,
            &MovieUpdate {
                score: Some(8.4),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.score, Some(8.4));
    assert_eq!(updated.genres.len(), 2);

    catalog
        .update_movie(
            &movie_id,
            &MovieUpdate {
                title: Some("Heat (1995)".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    let log = catalog.audit_log_for(&movie_id).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].new_score, Some(8.4));
    assert_eq!(log[1].new_title.as_deref(), Some("Heat (1995)"));
    assert!(log[0].action_timestamp <= log[1].action_timestamp);

    catalog.delete_movie(&movie_id).unwrap();
    assert!(matches!(
        catalog.get_movie(&movie_id),
        Err(MovieDbError::DocumentNotFound(_))
    ));
    // audit history outlives the movie
    assert_eq!(catalog.audit_log_for(&movie_id).unwrap().len(), 2);
}

#[test]
fn test_update_movie_rejects_invalid_kind_and_keeps_document() {
    let db = create_catalog_db();
    let catalog = MovieCatalog::new(&db);
    let id = catalog
        .add_movie(&NewMovie {
            title: Some("Heat".to_string()),
            ..Default::default()
        })
        .unwrap()
        .inserted_id;
    let before = catalog.get_movie(&id).unwrap();

    // a raw update bypassing the typed input
    let err = db
        .collection(MOVIES)
        .unwrap()
        .update_one(&json!({"_id": id.to_value()}), &json!({"$set": {"year": "soon"}}))
        .unwrap_err();
    assert!(matches!(err, MovieDbError::SchemaError(_)));
    assert_eq!(catalog.get_movie(&id).unwrap(), before);
    assert!(catalog.audit_log_for(&id).unwrap().is_empty());
}
