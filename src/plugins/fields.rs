use crate::core::allocator::{self, CounterKind};
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
#[clap(name = "field", about = "Register, update and look up fields")]
pub struct FieldCli {
    #[clap(subcommand)]
    pub command: FieldCommand,
}

#[derive(Subcommand, Debug)]
pub enum FieldCommand {
    /// Register a field owned by the calling farmer.
    Register {
        #[clap(long)]
        location: String,
        #[clap(long)]
        size: u64,
        #[clap(long)]
        soil: String,
    },
    /// Replace a field's attributes. Owner only.
    Update {
        #[clap(long)]
        id: u64,
        #[clap(long)]
        location: String,
        #[clap(long)]
        size: u64,
        #[clap(long)]
        soil: String,
        #[clap(long, default_value = "true", action = clap::ArgAction::Set)]
        active: bool,
    },
    /// Show a field record.
    Get {
        #[clap(long)]
        id: u64,
    },
    /// List fields owned by an identity.
    List {
        #[clap(long)]
        owner: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub field_id: u64,
    pub owner: Identity,
    pub location: String,
    pub size_hectares: u64,
    pub soil_type: String,
    pub registered_at: u64,
    pub active: bool,
}

/// Mutable attributes of a field.
#[derive(Debug, Clone, Copy)]
pub struct FieldParams<'a> {
    pub location: &'a str,
    pub size_hectares: u64,
    pub soil_type: &'a str,
}

impl FieldParams<'_> {
    /// Validates the attributes and returns the size as stored.
    fn check(&self) -> Result<i64, AgroError> {
        bounds::check_text("location", self.location, bounds::MAX_LOCATION)?;
        bounds::check_text("soil_type", self.soil_type, bounds::MAX_SHORT_LABEL)?;
        sqlint::to_column("size_hectares", self.size_hectares)
    }
}

const FIELD_COLUMNS: &str =
    "field_id, owner, location, size_hectares, soil_type, registered_at, active";

fn field_from_row(row: &Row<'_>) -> rusqlite::Result<Field> {
    Ok(Field {
        field_id: sqlint::from_column(row, 0)?,
        owner: row.get(1)?,
        location: row.get(2)?,
        size_hectares: sqlint::from_column(row, 3)?,
        soil_type: row.get(4)?,
        registered_at: sqlint::from_column(row, 5)?,
        active: row.get(6)?,
    })
}

pub fn initialize_fields_schema(conn: &Connection) -> Result<(), AgroError> {
    conn.execute(schemas::FIELDS_SCHEMA, [])?;
    conn.execute(schemas::FIELDS_OWNER_INDEX, [])?;
    Ok(())
}

/// Registers a field for the calling farmer and returns its id.
pub fn register_field(
    store: &Store,
    ctx: &CallContext,
    attrs: FieldParams<'_>,
) -> Result<u64, AgroError> {
    let size = attrs.check()?;
    let at = sqlint::to_column("at", ctx.at)?;
    let broker = DbBroker::for_store(store);
    broker.with_tx(&store.db_path(), ctx.caller.as_str(), "field.register", |conn| {
        guard::require_active_farmer(conn, &ctx.caller)?;
        let field_id = allocator::allocate(conn, CounterKind::Field)?;
        conn.execute(
            "INSERT INTO fields(field_id, owner, location, size_hectares, soil_type, registered_at, active)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, 1)",
            params![
                sqlint::to_column("field_id", field_id)?,
                ctx.caller,
                attrs.location,
                size,
                attrs.soil_type,
                at
            ],
        )?;
        Ok(field_id)
    })
}

/// Replaces a field's mutable attributes.
///
/// The caller must be the current owner; whether the caller is still an active farmer does
/// not matter. `registered_at` is kept and the owner is rewritten to the caller, which is
/// the owner already.
pub fn update_field(
    store: &Store,
    ctx: &CallContext,
    field_id: u64,
    attrs: FieldParams<'_>,
    active: bool,
) -> Result<bool, AgroError> {
    let size = attrs.check()?;
    let broker = DbBroker::for_store(store);
    broker.with_tx(&store.db_path(), ctx.caller.as_str(), "field.update", |conn| {
        guard::require_field_owner(conn, field_id, &ctx.caller)?;
        let existing = read_field(conn, field_id)?
            .ok_or_else(|| AgroError::NotFound(format!("field {} does not exist", field_id)))?;
        conn.execute(
            "UPDATE fields
             SET owner = ?2, location = ?3, size_hectares = ?4, soil_type = ?5, active = ?6
             WHERE field_id = ?1",
            params![
                sqlint::to_column("field_id", existing.field_id)?,
                ctx.caller,
                attrs.location,
                size,
                attrs.soil_type,
                active
            ],
        )?;
        Ok(true)
    })
}

pub(crate) fn read_field(conn: &Connection, field_id: u64) -> Result<Option<Field>, AgroError> {
    let Some(key) = sqlint::lookup(field_id) else {
        return Ok(None);
    };
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM fields WHERE field_id = ?1", FIELD_COLUMNS),
            params![key],
            field_from_row,
        )
        .optional()?)
}

pub fn get_field(store: &Store, field_id: u64) -> Result<Option<Field>, AgroError> {
    let broker = DbBroker::for_store(store);
    broker.with_conn(&store.db_path(), "agrotrace", "field.get", |conn| {
        read_field(conn, field_id)
    })
}

pub fn list_fields_by_owner(store: &Store, owner: &Identity) -> Result<Vec<Field>, AgroError> {
    let broker = DbBroker::for_store(store);
    broker.with_conn(&store.db_path(), "agrotrace", "field.list", |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM fields WHERE owner = ?1 ORDER BY field_id",
            FIELD_COLUMNS
        ))?;
        let rows = stmt.query_map(params![owner], field_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    })
}

pub fn run_field_cli(
    store: &Store,
    caller: &CallerArgs,
    cli: FieldCli,
) -> Result<serde_json::Value, AgroError> {
    match cli.command {
        FieldCommand::Register { location, size, soil } => {
            let ctx = caller.context(store)?;
            let field_id = register_field(
                store,
                &ctx,
                FieldParams {
                    location: &location,
                    size_hectares: size,
                    soil_type: &soil,
                },
            )?;
            Ok(time::command_envelope(
                "field.register",
                "ok",
                serde_json::json!({ "field_id": field_id, "owner": ctx.caller }),
            ))
        }
        FieldCommand::Update {
            id,
            location,
            size,
            soil,
            active,
        } => {
            let ctx = caller.context(store)?;
            let updated = update_field(
                store,
                &ctx,
                id,
                FieldParams {
                    location: &location,
                    size_hectares: size,
                    soil_type: &soil,
                },
                active,
            )?;
            Ok(time::command_envelope(
                "field.update",
                "ok",
                serde_json::json!({ "field_id": id, "updated": updated }),
            ))
        }
        FieldCommand::Get { id } => {
            let field = get_field(store, id)?;
            Ok(time::command_envelope(
                "field.get",
                if field.is_some() { "ok" } else { "not_found" },
                serde_json::json!({ "field_id": id, "field": field }),
            ))
        }
        FieldCommand::List { owner } => {
            let owner = Identity::new(&owner)?;
            let fields = list_fields_by_owner(store, &owner)?;
            Ok(time::command_envelope(
                "field.list",
                "ok",
                serde_json::json!({ "owner": owner, "count": fields.len(), "fields": fields }),
            ))
        }
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "field",
        "version": "0.1.0",
        "description": "Fields owned by registered farmers; attributes mutable by the owner",
        "commands": [
            { "name": "register", "parameters": ["location", "size", "soil"], "errors": ["not_authorized"] },
            { "name": "update", "parameters": ["id", "location", "size", "soil", "active"], "errors": ["not_authorized", "not_found"] },
            { "name": "get", "parameters": ["id"] },
            { "name": "list", "parameters": ["owner"] }
        ],
        "storage": ["registry.db:fields", "registry.db:counters"]
    })
}
