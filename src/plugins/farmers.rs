use crate::core::bounds;
use crate::core::broker::DbBroker;
use crate::core::error::AgroError;
use crate::core::guard;
use crate::core::identity::{CallContext, CallerArgs, Identity};
use crate::core::schemas;
use crate::core::sqlint;
use crate::core::store::Store;
use crate::core::time;
use clap::{Parser, Subcommand};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[clap(name = "farmer", about = "Register and look up farmers")]
pub struct FarmerCli {
    #[clap(subcommand)]
    pub command: FarmerCommand,
}

#[derive(Subcommand, Debug)]
pub enum FarmerCommand {
    /// Register the calling identity as a farmer.
    Register {
        #[clap(long)]
        name: String,
        #[clap(long)]
        location: String,
    },
    /// Show a farmer record.
    Get {
        #[clap(long)]
        id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Farmer {
    pub identity: Identity,
    pub name: String,
    pub location: String,
    pub registered_at: u64,
    pub active: bool,
}

fn farmer_from_row(row: &Row<'_>) -> rusqlite::Result<Farmer> {
    Ok(Farmer {
        identity: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        registered_at: sqlint::from_column(row, 3)?,
        active: row.get(4)?,
    })
}

pub fn initialize_farmers_schema(conn: &Connection) -> Result<(), AgroError> {
    conn.execute(schemas::FARMERS_SCHEMA, [])?;
    Ok(())
}

/// Registers the caller. An inactive record for the same identity is replaced.
pub fn register_farmer(
    store: &Store,
    ctx: &CallContext,
    name: &str,
    location: &str,
) -> Result<bool, AgroError> {
    bounds::check_text("name", name, bounds::MAX_NAME)?;
    bounds::check_text("location", location, bounds::MAX_LOCATION)?;
    let at = sqlint::to_column("at", ctx.at)?;

    let broker = DbBroker::for_store(store);
    broker.with_tx(&store.db_path(), ctx.caller.as_str(), "farmer.register", |conn| {
        if guard::is_active_farmer(conn, &ctx.caller)? {
            return Err(AgroError::AlreadyExists(format!(
                "farmer {} is already registered",
                ctx.caller
            )));
        }
        conn.execute(
            "INSERT OR REPLACE INTO farmers(identity, name, location, registered_at, active)
             VALUES(?1, ?2, ?3, ?4, 1)",
            params![ctx.caller, name, location, at],
        )?;
        Ok(true)
    })
}

pub(crate) fn read_farmer(conn: &Connection, identity: &Identity) -> Result<Option<Farmer>, AgroError> {
    Ok(conn
        .query_row(
            "SELECT identity, name, location, registered_at, active FROM farmers WHERE identity = ?1",
            params![identity],
            farmer_from_row,
        )
        .optional()?)
}

pub fn get_farmer(store: &Store, identity: &Identity) -> Result<Option<Farmer>, AgroError> {
    let broker = DbBroker::for_store(store);
    broker.with_conn(&store.db_path(), "agrotrace", "farmer.get", |conn| {
        read_farmer(conn, identity)
    })
}

pub fn run_farmer_cli(
    store: &Store,
    caller: &CallerArgs,
    cli: FarmerCli,
) -> Result<serde_json::Value, AgroError> {
    match cli.command {
        FarmerCommand::Register { name, location } => {
            let ctx = caller.context(store)?;
            let registered = register_farmer(store, &ctx, &name, &location)?;
            Ok(time::command_envelope(
                "farmer.register",
                "ok",
                serde_json::json!({ "identity": ctx.caller, "registered": registered, "at": ctx.at }),
            ))
        }
        FarmerCommand::Get { id } => {
            let identity = Identity::new(&id)?;
            let farmer = get_farmer(store, &identity)?;
            Ok(time::command_envelope(
                "farmer.get",
                if farmer.is_some() { "ok" } else { "not_found" },
                serde_json::json!({ "identity": identity, "farmer": farmer }),
            ))
        }
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "farmer",
        "version": "0.1.0",
        "description": "Farmer identities; one active record per identity",
        "commands": [
            { "name": "register", "parameters": ["name", "location"], "errors": ["already_exists"] },
            { "name": "get", "parameters": ["id"] }
        ],
        "storage": ["registry.db:farmers"]
    })
}
