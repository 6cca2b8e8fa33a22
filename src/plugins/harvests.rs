use crate::core::allocator::{self, CounterKind};
use crate::core::bounds;
use crate::core::broker::DbBroker;
use crate::core::error::AgroError;
use crate::core::identity::{CallContext, CallerArgs, Identity};
use crate::core::schemas;
use crate::core::sqlint;
use crate::core::store::Store;
use crate::core::time;
use crate::plugins::plantings;
use clap::{Parser, Subcommand};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[clap(name = "harvest", about = "Record and look up harvest events")]
pub struct HarvestCli {
    #[clap(subcommand)]
    pub command: HarvestCommand,
}

#[derive(Subcommand, Debug)]
pub enum HarvestCommand {
    /// Record a harvest against one of the caller's plantings.
    Record {
        #[clap(long)]
        planting: u64,
        #[clap(long = "yield")]
        yield_amount: u64,
        #[clap(long, default_value = "")]
        quality: String,
        #[clap(long)]
        date: String,
        #[clap(long, default_value = "")]
        notes: String,
    },
    /// Show a harvest record.
    Get {
        #[clap(long)]
        id: u64,
    },
    /// List harvests taken from a planting.
    List {
        #[clap(long)]
        planting: u64,
    },
}

/// Append-only harvest event. `field_id` is copied from the planting, never supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Harvest {
    pub harvest_id: u64,
    pub planting_id: u64,
    pub field_id: u64,
    pub owner: Identity,
    pub yield_amount: u64,
    pub quality_metrics: String,
    pub harvest_date: String,
    pub notes: String,
}

#[derive(Debug, Clone, Copy)]
pub struct HarvestParams<'a> {
    pub planting_id: u64,
    pub yield_amount: u64,
    pub quality_metrics: &'a str,
    pub harvest_date: &'a str,
    pub notes: &'a str,
}

const HARVEST_COLUMNS: &str =
    "harvest_id, planting_id, field_id, owner, yield_amount, quality_metrics, harvest_date, notes";

fn harvest_from_row(row: &Row<'_>) -> rusqlite::Result<Harvest> {
    Ok(Harvest {
        harvest_id: sqlint::from_column(row, 0)?,
        planting_id: sqlint::from_column(row, 1)?,
        field_id: sqlint::from_column(row, 2)?,
        owner: row.get(3)?,
        yield_amount: sqlint::from_column(row, 4)?,
        quality_metrics: row.get(5)?,
        harvest_date: row.get(6)?,
        notes: row.get(7)?,
    })
}

pub fn initialize_harvests_schema(conn: &Connection) -> Result<(), AgroError> {
    conn.execute(schemas::HARVESTS_SCHEMA, [])?;
    conn.execute(schemas::HARVESTS_PLANTING_INDEX, [])?;
    Ok(())
}

/// Records a harvest and returns its id. A missing planting is reported before ownership.
pub fn record_harvest(
    store: &Store,
    ctx: &CallContext,
    harvest: HarvestParams<'_>,
) -> Result<u64, AgroError> {
    bounds::check_text("quality_metrics", harvest.quality_metrics, bounds::MAX_QUALITY_METRICS)?;
    bounds::check_text("harvest_date", harvest.harvest_date, bounds::MAX_DATE)?;
    bounds::check_text("notes", harvest.notes, bounds::MAX_LONG_TEXT)?;
    let yield_amount = sqlint::to_column("yield_amount", harvest.yield_amount)?;

    let broker = DbBroker::for_store(store);
    broker.with_tx(&store.db_path(), ctx.caller.as_str(), "harvest.record", |conn| {
        let planting = plantings::read_planting(conn, harvest.planting_id)?.ok_or_else(|| {
            AgroError::InvalidPlanting(format!("planting {} does not exist", harvest.planting_id))
        })?;
        if planting.owner != ctx.caller {
            return Err(AgroError::NotAuthorized(format!(
                "{} does not own planting {}",
                ctx.caller, harvest.planting_id
            )));
        }
        let harvest_id = allocator::allocate(conn, CounterKind::Harvest)?;
        conn.execute(
            "INSERT INTO harvests(harvest_id, planting_id, field_id, owner, yield_amount, quality_metrics, harvest_date, notes)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                sqlint::to_column("harvest_id", harvest_id)?,
                sqlint::to_column("planting_id", planting.planting_id)?,
                sqlint::to_column("field_id", planting.field_id)?,
                ctx.caller,
                yield_amount,
                harvest.quality_metrics,
                harvest.harvest_date,
                harvest.notes
            ],
        )?;
        Ok(harvest_id)
    })
}

pub(crate) fn read_harvest(conn: &Connection, harvest_id: u64) -> Result<Option<Harvest>, AgroError> {
    let Some(key) = sqlint::lookup(harvest_id) else {
        return Ok(None);
    };
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM harvests WHERE harvest_id = ?1", HARVEST_COLUMNS),
            params![key],
            harvest_from_row,
        )
        .optional()?)
}

pub fn get_harvest(store: &Store, harvest_id: u64) -> Result<Option<Harvest>, AgroError> {
    let broker = DbBroker::for_store(store);
    broker.with_conn(&store.db_path(), "agrotrace", "harvest.get", |conn| {
        read_harvest(conn, harvest_id)
    })
}

pub fn list_harvests_for_planting(store: &Store, planting_id: u64) -> Result<Vec<Harvest>, AgroError> {
    let broker = DbBroker::for_store(store);
    broker.with_conn(&store.db_path(), "agrotrace", "harvest.list", |conn| {
        let Some(key) = sqlint::lookup(planting_id) else {
            return Ok(Vec::new());
        };
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM harvests WHERE planting_id = ?1 ORDER BY harvest_id",
            HARVEST_COLUMNS
        ))?;
        let rows = stmt.query_map(params![key], harvest_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    })
}

pub fn run_harvest_cli(
    store: &Store,
    caller: &CallerArgs,
    cli: HarvestCli,
) -> Result<serde_json::Value, AgroError> {
    match cli.command {
        HarvestCommand::Record {
            planting,
            yield_amount,
            quality,
            date,
            notes,
        } => {
            let ctx = caller.context(store)?;
            let harvest_id = record_harvest(
                store,
                &ctx,
                HarvestParams {
                    planting_id: planting,
                    yield_amount,
                    quality_metrics: &quality,
                    harvest_date: &date,
                    notes: &notes,
                },
            )?;
            Ok(time::command_envelope(
                "harvest.record",
                "ok",
                serde_json::json!({ "harvest_id": harvest_id, "planting_id": planting }),
            ))
        }
        HarvestCommand::Get { id } => {
            let harvest = get_harvest(store, id)?;
            Ok(time::command_envelope(
                "harvest.get",
                if harvest.is_some() { "ok" } else { "not_found" },
                serde_json::json!({ "harvest_id": id, "harvest": harvest }),
            ))
        }
        HarvestCommand::List { planting } => {
            let harvests = list_harvests_for_planting(store, planting)?;
            Ok(time::command_envelope(
                "harvest.list",
                "ok",
                serde_json::json!({ "planting_id": planting, "count": harvests.len(), "harvests": harvests }),
            ))
        }
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "harvest",
        "version": "0.1.0",
        "description": "Append-only harvest events linked to a planting and its field",
        "commands": [
            { "name": "record", "parameters": ["planting", "yield", "quality", "date", "notes"], "errors": ["invalid_planting", "not_authorized"] },
            { "name": "get", "parameters": ["id"] },
            { "name": "list", "parameters": ["planting"] }
        ],
        "storage": ["registry.db:harvests", "registry.db:counters"]
    })
}
