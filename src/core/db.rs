use crate::core::error::AgroError;
use crate::core::schemas;
use crate::core::store::Store;
use rusqlite::{Connection, OptionalExtension, params};
use std::time::Duration;

pub fn db_connect(db_path: &str, busy_timeout: Duration) -> Result<Connection, AgroError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(busy_timeout)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
    conn.execute("PRAGMA foreign_keys=ON;", [])?;
    Ok(conn)
}

/// Records the schema version on first initialization and refuses a newer on-disk layout.
pub fn ensure_schema_version(conn: &Connection) -> Result<u32, AgroError> {
    conn.execute(schemas::META_SCHEMA, [])?;
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    match stored {
        None => {
            conn.execute(
                "INSERT INTO meta(key, value) VALUES('schema_version', ?1)",
                params![schemas::REGISTRY_SCHEMA_VERSION.to_string()],
            )?;
            Ok(schemas::REGISTRY_SCHEMA_VERSION)
        }
        Some(raw) => {
            let version: u32 = raw.parse().map_err(|_| {
                AgroError::SchemaError(format!("unreadable schema_version '{}'", raw))
            })?;
            if version > schemas::REGISTRY_SCHEMA_VERSION {
                return Err(AgroError::SchemaError(format!(
                    "registry schema v{} is newer than supported v{}",
                    version,
                    schemas::REGISTRY_SCHEMA_VERSION
                )));
            }
            Ok(version)
        }
    }
}

/// Creates the store directory and every subsystem's tables. Safe to call repeatedly.
pub fn initialize_registry_db(store: &Store) -> Result<(), AgroError> {
    std::fs::create_dir_all(&store.root)?;
    crate::subsystems::initialize_all(store)
}
