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
use crate::plugins::fields;
use clap::{Parser, Subcommand};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[clap(name = "planting", about = "Record and look up planting events")]
pub struct PlantingCli {
    #[clap(subcommand)]
    pub command: PlantingCommand,
}

#[derive(Subcommand, Debug)]
pub enum PlantingCommand {
    /// Record a planting on a field the caller owns.
    Record {
        #[clap(long)]
        field: u64,
        #[clap(long)]
        crop: String,
        #[clap(long)]
        date: String,
        #[clap(long, default_value = "")]
        inputs: String,
        #[clap(long, default_value = "")]
        notes: String,
    },
    /// Show a planting record.
    Get {
        #[clap(long)]
        id: u64,
    },
    /// List plantings recorded on a field.
    List {
        #[clap(long)]
        field: u64,
    },
}

/// Append-only planting event. `field_id` is fixed at creation and never revalidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Planting {
    pub planting_id: u64,
    pub field_id: u64,
    pub owner: Identity,
    pub crop_type: String,
    pub planting_date: String,
    pub inputs_used: String,
    pub notes: String,
}

#[derive(Debug, Clone, Copy)]
pub struct PlantingParams<'a> {
    pub field_id: u64,
    pub crop_type: &'a str,
    pub planting_date: &'a str,
    pub inputs_used: &'a str,
    pub notes: &'a str,
}

const PLANTING_COLUMNS: &str =
    "planting_id, field_id, owner, crop_type, planting_date, inputs_used, notes";

fn planting_from_row(row: &Row<'_>) -> rusqlite::Result<Planting> {
    Ok(Planting {
        planting_id: sqlint::from_column(row, 0)?,
        field_id: sqlint::from_column(row, 1)?,
        owner: row.get(2)?,
        crop_type: row.get(3)?,
        planting_date: row.get(4)?,
        inputs_used: row.get(5)?,
        notes: row.get(6)?,
    })
}

pub fn initialize_plantings_schema(conn: &Connection) -> Result<(), AgroError> {
    conn.execute(schemas::PLANTINGS_SCHEMA, [])?;
    conn.execute(schemas::PLANTINGS_FIELD_INDEX, [])?;
    Ok(())
}

/// Records a planting and returns its id.
///
/// Ownership is checked first, so an unknown field reports `NotAuthorized`; the
/// `InvalidField` branch after it only fires if the field vanished in between.
pub fn record_planting(
    store: &Store,
    ctx: &CallContext,
    planting: PlantingParams<'_>,
) -> Result<u64, AgroError> {
    bounds::check_text("crop_type", planting.crop_type, bounds::MAX_SHORT_LABEL)?;
    bounds::check_text("planting_date", planting.planting_date, bounds::MAX_DATE)?;
    bounds::check_text("inputs_used", planting.inputs_used, bounds::MAX_LONG_TEXT)?;
    bounds::check_text("notes", planting.notes, bounds::MAX_LONG_TEXT)?;

    let broker = DbBroker::for_store(store);
    broker.with_tx(&store.db_path(), ctx.caller.as_str(), "planting.record", |conn| {
        guard::require_field_owner(conn, planting.field_id, &ctx.caller)?;
        if fields::read_field(conn, planting.field_id)?.is_none() {
            return Err(AgroError::InvalidField(format!(
                "field {} does not exist",
                planting.field_id
            )));
        }
        let planting_id = allocator::allocate(conn, CounterKind::Planting)?;
        conn.execute(
            "INSERT INTO plantings(planting_id, field_id, owner, crop_type, planting_date, inputs_used, notes)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                sqlint::to_column("planting_id", planting_id)?,
                sqlint::to_column("field_id", planting.field_id)?,
                ctx.caller,
                planting.crop_type,
                planting.planting_date,
                planting.inputs_used,
                planting.notes
            ],
        )?;
        Ok(planting_id)
    })
}

pub(crate) fn read_planting(conn: &Connection, planting_id: u64) -> Result<Option<Planting>, AgroError> {
    let Some(key) = sqlint::lookup(planting_id) else {
        return Ok(None);
    };
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM plantings WHERE planting_id = ?1", PLANTING_COLUMNS),
            params![key],
            planting_from_row,
        )
        .optional()?)
}

pub fn get_planting(store: &Store, planting_id: u64) -> Result<Option<Planting>, AgroError> {
    let broker = DbBroker::for_store(store);
    broker.with_conn(&store.db_path(), "agrotrace", "planting.get", |conn| {
        read_planting(conn, planting_id)
    })
}

pub fn list_plantings_for_field(store: &Store, field_id: u64) -> Result<Vec<Planting>, AgroError> {
    let broker = DbBroker::for_store(store);
    broker.with_conn(&store.db_path(), "agrotrace", "planting.list", |conn| {
        let Some(key) = sqlint::lookup(field_id) else {
            return Ok(Vec::new());
        };
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM plantings WHERE field_id = ?1 ORDER BY planting_id",
            PLANTING_COLUMNS
        ))?;
        let rows = stmt.query_map(params![key], planting_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    })
}

pub fn run_planting_cli(
    store: &Store,
    caller: &CallerArgs,
    cli: PlantingCli,
) -> Result<serde_json::Value, AgroError> {
    match cli.command {
        PlantingCommand::Record {
            field,
            crop,
            date,
            inputs,
            notes,
        } => {
            let ctx = caller.context(store)?;
            let planting_id = record_planting(
                store,
                &ctx,
                PlantingParams {
                    field_id: field,
                    crop_type: &crop,
                    planting_date: &date,
                    inputs_used: &inputs,
                    notes: &notes,
                },
            )?;
            Ok(time::command_envelope(
                "planting.record",
                "ok",
                serde_json::json!({ "planting_id": planting_id, "field_id": field }),
            ))
        }
        PlantingCommand::Get { id } => {
            let planting = get_planting(store, id)?;
            Ok(time::command_envelope(
                "planting.get",
                if planting.is_some() { "ok" } else { "not_found" },
                serde_json::json!({ "planting_id": id, "planting": planting }),
            ))
        }
        PlantingCommand::List { field } => {
            let plantings = list_plantings_for_field(store, field)?;
            Ok(time::command_envelope(
                "planting.list",
                "ok",
                serde_json::json!({ "field_id": field, "count": plantings.len(), "plantings": plantings }),
            ))
        }
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "planting",
        "version": "0.1.0",
        "description": "Append-only planting events on owned fields",
        "commands": [
            { "name": "record", "parameters": ["field", "crop", "date", "inputs", "notes"], "errors": ["not_authorized", "invalid_field"] },
            { "name": "get", "parameters": ["id"] },
            { "name": "list", "parameters": ["field"] }
        ],
        "storage": ["registry.db:plantings", "registry.db:counters"]
    })
}
