//src/db.rs
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const DB_FILE_NAME: &str = "set-tracker.sqlite";
const APP_DATA_DIR: &str = "set-tracker";
const DATA_ENV_VAR: &str = "SET_TRACKER_DATA_DIR";
const STATE_KEY: &str = "state";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection failed")]
    Connection(#[from] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing database file")]
    Io(#[from] std::io::Error),
    #[error("Database query failed: {0}")]
    QueryFailed(rusqlite::Error),
    #[error("Database write failed: {0}")]
    WriteFailed(rusqlite::Error),
}

/// Opaque load/save of the serialized application state.
pub trait StateGateway {
    /// Returns the last saved blob, or `None` on first run.
    /// # Errors
    /// Storage failures.
    fn load(&self) -> Result<Option<String>, DbError>;

    /// Overwrites the stored blob.
    /// # Errors
    /// Storage failures.
    fn save(&self, blob: &str) -> Result<(), DbError>;
}

/// Stores the state blob in a single-row key/value table.
pub struct SqliteGateway {
    conn: Connection,
}

impl SqliteGateway {
    /// Opens (or creates) the database file and its table.
    /// # Errors
    /// Returns `DbError` if the file cannot be opened or the schema cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path).map_err(DbError::Connection)?;
        Self::from_connection(conn)
    }

    /// # Errors
    /// Returns `DbError` if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory().map_err(DbError::Connection)?;
        Self::from_connection(conn)
    }

    /// Wraps an existing connection, creating the table if needed.
    /// # Errors
    /// Returns `DbError` if the schema cannot be created.
    pub fn from_connection(conn: Connection) -> Result<Self, DbError> {
        init_db(&conn)?;
        Ok(Self { conn })
    }
}

impl StateGateway for SqliteGateway {
    fn load(&self) -> Result<Option<String>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM kv_store WHERE key = ?1")
            .map_err(DbError::QueryFailed)?;
        stmt.query_row(params![STATE_KEY], |row| row.get(0))
            .optional()
            .map_err(DbError::QueryFailed)
    }

    fn save(&self, blob: &str) -> Result<(), DbError> {
        self.conn
            .execute(
                "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![STATE_KEY, blob],
            )
            .map_err(DbError::WriteFailed)?;
        debug!(bytes = blob.len(), "state saved");
        Ok(())
    }
}

/// Initializes the key/value table if it doesn't exist.
/// # Errors
/// Returns `DbError::Connection` if the statement fails.
pub fn init_db(conn: &Connection) -> Result<(), DbError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        )",
        [],
    )
    .map_err(DbError::Connection)?;
    Ok(())
}

/// Gets the path to the SQLite database file within the app's data directory.
/// # Errors
/// Returns `DbError` if no data directory can be determined or created.
pub fn get_db_path() -> Result<PathBuf, DbError> {
    let app_dir = match std::env::var(DATA_ENV_VAR).ok() {
        Some(path_str) => PathBuf::from(path_str),
        None => dirs::data_dir().ok_or(DbError::DataDir)?.join(APP_DATA_DIR),
    };
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}
