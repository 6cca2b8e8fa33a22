//! Subsystem registration: centralizes schema initialization and schema discovery.
//!
//! Adding a new subsystem: append one entry to `SUBSYSTEMS`.

use crate::core::broker::{self, DbBroker};
use crate::core::error::AgroError;
use crate::core::store::Store;
use crate::core::{allocator, db, digest};
use crate::plugins::{access, farmers, fields, harvests, plantings, verifiers};
use rusqlite::Connection;

pub(crate) struct SubsystemInit {
    pub name: &'static str,
    pub initialize_schema: fn(&Connection) -> Result<(), AgroError>,
    pub schema: fn() -> serde_json::Value,
}

/// Tables are created in this order inside one transaction.
pub(crate) const SUBSYSTEMS: &[SubsystemInit] = &[
    SubsystemInit { name: "counters", initialize_schema: allocator::initialize_counters, schema: counters_schema },
    SubsystemInit { name: "farmer", initialize_schema: farmers::initialize_farmers_schema, schema: farmers::schema },
    SubsystemInit { name: "field", initialize_schema: fields::initialize_fields_schema, schema: fields::schema },
    SubsystemInit { name: "planting", initialize_schema: plantings::initialize_plantings_schema, schema: plantings::schema },
    SubsystemInit { name: "harvest", initialize_schema: harvests::initialize_harvests_schema, schema: harvests::schema },
    SubsystemInit { name: "verifier", initialize_schema: verifiers::initialize_verifiers_schema, schema: verifiers::schema },
    SubsystemInit { name: "access", initialize_schema: access::initialize_access_schema, schema: access::schema },
];

fn counters_schema() -> serde_json::Value {
    serde_json::json!({
        "name": "counters",
        "version": "0.1.0",
        "description": "Monotonic id counters for fields, plantings, harvests and verifications",
        "commands": [
            { "name": "counters", "description": "Show the next id per kind" }
        ],
        "storage": ["registry.db:counters"]
    })
}

/// Initialize every subsystem's tables in one transaction.
pub(crate) fn initialize_all(store: &Store) -> Result<(), AgroError> {
    let broker = DbBroker::for_store(store);
    broker.with_tx(&store.db_path(), "agrotrace", "registry.init", |conn| {
        db::ensure_schema_version(conn)?;
        for sub in SUBSYSTEMS {
            (sub.initialize_schema)(conn)?;
        }
        Ok(())
    })
}

/// Schema discovery for every subsystem, optionally filtered by name.
pub fn all_schemas(filter: Option<&str>) -> Vec<serde_json::Value> {
    let mut out: Vec<serde_json::Value> = SUBSYSTEMS
        .iter()
        .filter(|sub| filter.is_none_or(|f| f == sub.name))
        .map(|sub| (sub.schema)())
        .collect();
    let shared: [(&str, fn() -> serde_json::Value); 2] =
        [("broker", broker::schema), ("digest", digest::schema)];
    for (name, schema) in shared {
        if filter.is_none_or(|f| f == name) {
            out.push(schema());
        }
    }
    out
}
