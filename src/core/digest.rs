//! Content digest over the whole registry.
//!
//! Each table is hashed as canonical JSON rows in primary-key order, then the per-table
//! hashes are folded into one root. Two registries with the same records, grants and
//! counters produce the same root regardless of the order the writes happened in the file.

use crate::core::broker::DbBroker;
use crate::core::error::AgroError;
use crate::core::store::Store;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// (table, ORDER BY clause) in the order they are folded into the root.
const DIGEST_TABLES: &[(&str, &str)] = &[
    ("farmers", "identity"),
    ("fields", "field_id"),
    ("plantings", "planting_id"),
    ("harvests", "harvest_id"),
    ("verifiers", "identity"),
    ("verifications", "verification_id"),
    ("access_grants", "data_kind, data_id, accessor"),
    ("counters", "kind"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDigest {
    pub table: String,
    pub rows: u64,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryDigest {
    pub root: String,
    pub tables: Vec<TableDigest>,
}

fn column_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Value::from(f),
        ValueRef::Text(t) => serde_json::Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => {
            serde_json::Value::from(b.iter().map(|byte| format!("{:02x}", byte)).collect::<String>())
        }
    }
}

fn digest_table(conn: &Connection, table: &str, order_by: &str) -> Result<TableDigest, AgroError> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM {} ORDER BY {}", table, order_by))?;
    let columns = stmt.column_count();
    let mut rows = stmt.query([])?;
    let mut hasher = Sha256::new();
    let mut count = 0u64;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns);
        for i in 0..columns {
            values.push(column_json(row.get_ref(i)?));
        }
        hasher.update(serde_json::to_string(&values)?.as_bytes());
        hasher.update(b"\n");
        count += 1;
    }
    Ok(TableDigest {
        table: table.to_string(),
        rows: count,
        hash: format!("{:x}", hasher.finalize()),
    })
}

pub fn compute_digest(conn: &Connection) -> Result<RegistryDigest, AgroError> {
    let mut tables = Vec::with_capacity(DIGEST_TABLES.len());
    let mut root = Sha256::new();
    for (table, order_by) in DIGEST_TABLES {
        let td = digest_table(conn, table, order_by)?;
        root.update(format!("{}:{}:{}\n", td.table, td.rows, td.hash).as_bytes());
        tables.push(td);
    }
    Ok(RegistryDigest {
        root: format!("{:x}", root.finalize()),
        tables,
    })
}

pub fn registry_digest(store: &Store) -> Result<RegistryDigest, AgroError> {
    let broker = DbBroker::for_store(store);
    broker.with_conn(&store.db_path(), "agrotrace", "registry.digest", compute_digest)
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "digest",
        "version": "0.1.0",
        "description": "SHA-256 root over every registry table",
        "commands": [
            { "name": "digest", "description": "Print the per-table hashes and the registry root" }
        ],
        "storage": []
    })
}
