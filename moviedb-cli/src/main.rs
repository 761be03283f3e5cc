mod logging;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use moviedb_core::{
    CollectionCore, Date, DatabaseCore, DocumentId, FileStorage, FindOptions, MovieCatalog, MovieUpdate,
    NewDirector, NewMovie, ObjectId, DATABASE_NAME,
};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::logging::LogLevel;

#[derive(Parser)]
#[command(name = "moviedb")]
#[command(about = "MovieDB CLI - manage the movie catalog database")]
#[command(version)]
struct Cli {
    /// Database file path
    #[arg(long, global = true, env = "MOVIEDB_PATH", default_value = "moviedb.json")]
    db: PathBuf,

    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    /// Name recorded in audit entries of movie updates
    #[arg(long, global = true, env = "MOVIEDB_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create collections, validators and indexes
    Init,
    /// Add a director
    AddDirector {
        #[arg(long)]
        name: String,
        /// Birth date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        birth_date: Option<Date>,
        #[arg(long)]
        nationality: Option<String>,
    },
    /// Add a genre (names are unique)
    AddGenre { name: String },
    /// Add a movie
    AddMovie(MovieArgs),
    /// Update the given fields of a movie, logging title/score changes
    UpdateMovie {
        id: String,
        #[command(flatten)]
        fields: MovieArgs,
    },
    /// Print one document as JSON
    Get { collection: String, id: String },
    /// Print documents of a collection as JSON
    List {
        collection: String,
        /// Sort field
        #[arg(long)]
        sort: Option<String>,
        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        skip: Option<usize>,
    },
    /// Delete one document by id
    Delete { collection: String, id: String },
    /// Print the audit log of a movie
    Audit { movie_id: String },
    /// Import data from JSON file into database
    Import {
        /// JSON file: { "collection": [documents...], ... }
        file: PathBuf,
    },
    /// Export database to JSON file
    Export {
        /// Output JSON file
        file: PathBuf,
        /// Export only specific collection
        #[arg(long)]
        collection: Option<String>,
    },
}

#[derive(Args, Default)]
struct MovieArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    score: Option<f64>,
    #[arg(long)]
    metascore: Option<i32>,
    #[arg(long)]
    votes: Option<i32>,
    #[arg(long)]
    director_id: Option<ObjectId>,
    #[arg(long)]
    runtime: Option<i32>,
    #[arg(long)]
    revenue: Option<f64>,
    #[arg(long)]
    description: Option<String>,
    /// Genre id, repeat for several genres
    #[arg(long = "genre")]
    genres: Vec<ObjectId>,
}

impl MovieArgs {
    fn genre_ids(&self) -> Option<Vec<ObjectId>> {
        if self.genres.is_empty() {
            None
        } else {
            Some(self.genres.clone())
        }
    }

    fn into_new_movie(self) -> NewMovie {
        NewMovie {
            genre_ids: self.genre_ids(),
            title: self.title,
            year: self.year,
            score: self.score,
            metascore: self.metascore,
            votes: self.votes,
            director_id: self.director_id,
            runtime: self.runtime,
            revenue: self.revenue,
            description: self.description,
        }
    }

    fn into_update(self) -> MovieUpdate {
        MovieUpdate {
            genre_ids: self.genre_ids(),
            title: self.title,
            year: self.year,
            score: self.score,
            metascore: self.metascore,
            votes: self.votes,
            director_id: self.director_id,
            runtime: self.runtime,
            revenue: self.revenue,
            description: self.description,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    let output = run_as(&cli.db, cli.user.as_deref(), cli.command)?;
    if let Some(value) = output {
        println!(
            "{}",
            serde_json::to_string_pretty(&value).with_context(|| "Failed to serialize output")?
        );
    }
    Ok(())
}

/// Open the database file and make sure the catalog exists
fn open_database(db_path: &Path) -> Result<DatabaseCore<FileStorage>> {
    let db = DatabaseCore::open(DATABASE_NAME, db_path)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
    MovieCatalog::new(&db)
        .initialize()
        .with_context(|| "Failed to initialize catalog")?;
    Ok(db)
}

/// Collection handle for read and delete commands; never creates one
fn existing_collection(
    db: &DatabaseCore<FileStorage>,
    name: &str,
) -> Result<Option<Arc<CollectionCore<FileStorage>>>> {
    if !db.has_collection(name) {
        return Ok(None);
    }
    Ok(Some(db.collection(name)?))
}

/// Execute one command; returns the JSON to print, if any
#[cfg(test)]
fn run(db_path: &Path, command: Commands) -> Result<Option<Value>> {
    run_as(db_path, None, command)
}

/// Execute one command on behalf of `user`
fn run_as(db_path: &Path, user: Option<&str>, command: Commands) -> Result<Option<Value>> {
    let db = open_database(db_path)?;
    let mut catalog = MovieCatalog::new(&db);
    if let Some(user) = user {
        catalog = catalog.with_user(user);
    }

    let output = match command {
        Commands::Init => {
            info!("Catalog ready at {}", db_path.display());
            Some(json!({ "collections": db.list_collections() }))
        }
        Commands::AddDirector {
            name,
            birth_date,
            nationality,
        } => {
            let id = catalog
                .create_director(&NewDirector {
                    name: Some(name),
                    birth_date,
                    nationality,
                })
                .with_context(|| "Failed to add director")?;
            Some(json!({ "inserted_id": id }))
        }
        Commands::AddGenre { name } => {
            let id = catalog
                .create_genre(&name)
                .with_context(|| format!("Failed to add genre '{}'", name))?;
            Some(json!({ "inserted_id": id }))
        }
        Commands::AddMovie(fields) => {
            let result = catalog
                .add_movie(&fields.into_new_movie())
                .with_context(|| "Failed to add movie")?;
            Some(serde_json::to_value(result)?)
        }
        Commands::UpdateMovie { id, fields } => {
            let movie = catalog
                .update_movie(&DocumentId::parse(&id), &fields.into_update())
                .with_context(|| format!("Failed to update movie {}", id))?;
            Some(serde_json::to_value(movie)?)
        }
        Commands::Get { collection, id } => {
            let doc = existing_collection(&db, &collection)?
                .with_context(|| format!("No collection '{}'", collection))?
                .find_by_id(&DocumentId::parse(&id))?
                .with_context(|| format!("No document {} in '{}'", id, collection))?;
            Some(doc.into_value())
        }
        Commands::List {
            collection,
            sort,
            desc,
            limit,
            skip,
        } => {
            let mut options = FindOptions::new();
            if let Some(field) = sort {
                options = options.with_sort(vec![(field, if desc { -1 } else { 1 })]);
            }
            options.limit = limit;
            options.skip = skip;

            let docs = match existing_collection(&db, &collection)? {
                Some(coll) => coll
                    .find_with_options(&json!({}), &options)
                    .with_context(|| format!("Failed to query collection: {}", collection))?,
                None => Vec::new(),
            };
            Some(Value::Array(docs.into_iter().map(|d| d.into_value()).collect()))
        }
        Commands::Delete { collection, id } => {
            let doc_id = DocumentId::parse(&id);
            let deleted = existing_collection(&db, &collection)?
                .with_context(|| format!("No collection '{}'", collection))?
                .delete_one(&json!({ "_id": doc_id.to_value() }))?;
            if deleted == 0 {
                bail!("No document {} in '{}'", id, collection);
            }
            Some(json!({ "deleted_count": deleted }))
        }
        Commands::Audit { movie_id } => {
            let log = catalog.audit_log_for(&DocumentId::parse(&movie_id))?;
            Some(serde_json::to_value(log)?)
        }
        Commands::Import { file } => {
            import_data(&db, &file)?;
            None
        }
        Commands::Export { file, collection } => {
            export_data(&db, &file, collection.as_deref())?;
            None
        }
    };

    db.flush()
        .with_context(|| format!("Failed to write database: {}", db_path.display()))?;
    Ok(output)
}

/// Import data from JSON file
/// Format: { "collection_name": [documents...], ... }
fn import_data(db: &DatabaseCore<FileStorage>, file: &Path) -> Result<()> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let data: Map<String, Value> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in file: {}", file.display()))?;

    let mut total_docs = 0;

    for (collection_name, documents) in data {
        let docs = documents
            .as_array()
            .with_context(|| format!("Collection '{}' must be an array", collection_name))?;

        let coll = db.collection(&collection_name)?;
        for doc in docs {
            let fields = doc
                .as_object()
                .with_context(|| "Document must be an object")?
                .clone();

            coll.insert_one(fields)
                .with_context(|| format!("Failed to insert document into {}", collection_name))?;
            total_docs += 1;
        }

        eprintln!(
            "Imported {} documents into '{}'",
            docs.len(),
            collection_name
        );
    }

    eprintln!("Total: {} documents imported", total_docs);
    Ok(())
}

/// Export database to JSON file
fn export_data(
    db: &DatabaseCore<FileStorage>,
    file: &Path,
    collection_filter: Option<&str>,
) -> Result<()> {
    let mut output: Map<String, Value> = Map::new();
    let mut total_docs = 0;

    for coll_name in db.list_collections() {
        if let Some(filter) = collection_filter {
            if coll_name != filter {
                continue;
            }
        }

        let docs = db
            .collection(&coll_name)?
            .find(&json!({}))
            .with_context(|| format!("Failed to query collection: {}", coll_name))?;

        eprintln!("Exporting {} documents from '{}'", docs.len(), coll_name);
        total_docs += docs.len();
        output.insert(
            coll_name,
            Value::Array(docs.into_iter().map(|d| d.into_value()).collect()),
        );
    }

    let json =
        serde_json::to_string_pretty(&output).with_context(|| "Failed to serialize to JSON")?;

    fs::write(file, json)
        .with_context(|| format!("Failed to write to file: {}", file.display()))?;

    eprintln!(
        "Total: {} documents exported to {}",
        total_docs,
        file.display()
    );
    Ok(())
}
