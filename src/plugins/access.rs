//! Access control ledger.
//!
//! One grant per `(data_kind, data_id, accessor)`. Granting again overwrites, revoking
//! deletes, so whether a grant exists depends only on the latest grant or revoke on that key.
//! The access level is stored as a label and not enforced here.

use crate::core::broker::DbBroker;
use crate::core::error::AgroError;
use crate::core::guard;
use crate::core::identity::{CallContext, CallerArgs, Identity};
use crate::core::kinds::{AccessLevel, RecordKind};
use crate::core::schemas;
use crate::core::sqlint;
use crate::core::store::Store;
use crate::core::time;
use clap::{Parser, Subcommand};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[clap(name = "access", about = "Grant, revoke and check access to registry records")]
pub struct AccessCli {
    #[clap(subcommand)]
    pub command: AccessCommand,
}

#[derive(Subcommand, Debug)]
pub enum AccessCommand {
    /// Grant an accessor access to a record the caller owns.
    Grant {
        #[clap(long)]
        kind: String,
        #[clap(long)]
        id: u64,
        #[clap(long)]
        accessor: String,
        #[clap(long, default_value = "full")]
        level: String,
    },
    /// Revoke a grant the caller issued.
    Revoke {
        #[clap(long)]
        kind: String,
        #[clap(long)]
        id: u64,
        #[clap(long)]
        accessor: String,
    },
    /// Show the grant for an accessor, if any.
    Check {
        #[clap(long)]
        kind: String,
        #[clap(long)]
        id: u64,
        #[clap(long)]
        accessor: String,
    },
    /// List every grant on a record.
    List {
        #[clap(long)]
        kind: String,
        #[clap(long)]
        id: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub data_kind: RecordKind,
    pub data_id: u64,
    pub accessor: Identity,
    pub granted_by: Identity,
    pub granted_at: u64,
    pub access_level: AccessLevel,
}

const GRANT_COLUMNS: &str = "data_kind, data_id, accessor, granted_by, granted_at, access_level";

fn grant_from_row(row: &Row<'_>) -> rusqlite::Result<AccessGrant> {
    Ok(AccessGrant {
        data_kind: row.get(0)?,
        data_id: sqlint::from_column(row, 1)?,
        accessor: row.get(2)?,
        granted_by: row.get(3)?,
        granted_at: sqlint::from_column(row, 4)?,
        access_level: row.get(5)?,
    })
}

pub fn initialize_access_schema(conn: &Connection) -> Result<(), AgroError> {
    conn.execute(schemas::ACCESS_GRANTS_SCHEMA, [])?;
    Ok(())
}

/// Grants (or re-grants) `accessor` access to a record owned by the caller.
pub fn grant_access(
    store: &Store,
    ctx: &CallContext,
    data_kind: RecordKind,
    data_id: u64,
    accessor: &Identity,
    access_level: AccessLevel,
) -> Result<bool, AgroError> {
    let at = sqlint::to_column("at", ctx.at)?;
    let broker = DbBroker::for_store(store);
    broker.with_tx(&store.db_path(), ctx.caller.as_str(), "access.grant", |conn| {
        guard::require_record_owner(conn, data_kind, data_id, &ctx.caller)?;
        let key = sqlint::to_column("data_id", data_id)?;
        conn.execute(
            "INSERT INTO access_grants(data_kind, data_id, accessor, granted_by, granted_at, access_level)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(data_kind, data_id, accessor) DO UPDATE SET
                granted_by = excluded.granted_by,
                granted_at = excluded.granted_at,
                access_level = excluded.access_level",
            params![data_kind, key, accessor, ctx.caller, at, access_level],
        )?;
        Ok(true)
    })
}

/// String-tagged entry point: an unknown kind or level is `InvalidInput`.
pub fn grant_access_tagged(
    store: &Store,
    ctx: &CallContext,
    data_kind: &str,
    data_id: u64,
    accessor: &Identity,
    access_level: &str,
) -> Result<bool, AgroError> {
    let kind: RecordKind = data_kind.parse()?;
    let level: AccessLevel = access_level.parse()?;
    grant_access(store, ctx, kind, data_id, accessor, level)
}

/// Deletes a grant. Only its issuer may do so; record ownership is not re-checked.
pub fn revoke_access(
    store: &Store,
    ctx: &CallContext,
    data_kind: RecordKind,
    data_id: u64,
    accessor: &Identity,
) -> Result<bool, AgroError> {
    let broker = DbBroker::for_store(store);
    broker.with_tx(&store.db_path(), ctx.caller.as_str(), "access.revoke", |conn| {
        guard::require_granter(conn, data_kind, data_id, accessor, &ctx.caller)?;
        conn.execute(
            "DELETE FROM access_grants WHERE data_kind = ?1 AND data_id = ?2 AND accessor = ?3",
            params![data_kind, sqlint::to_column("data_id", data_id)?, accessor],
        )?;
        Ok(true)
    })
}

pub fn check_access(
    store: &Store,
    data_kind: RecordKind,
    data_id: u64,
    accessor: &Identity,
) -> Result<Option<AccessGrant>, AgroError> {
    let broker = DbBroker::for_store(store);
    broker.with_conn(&store.db_path(), "agrotrace", "access.check", |conn| {
        let Some(key) = sqlint::lookup(data_id) else {
            return Ok(None);
        };
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM access_grants WHERE data_kind = ?1 AND data_id = ?2 AND accessor = ?3",
                    GRANT_COLUMNS
                ),
                params![data_kind, key, accessor],
                grant_from_row,
            )
            .optional()?)
    })
}

pub fn list_grants_for_record(
    store: &Store,
    data_kind: RecordKind,
    data_id: u64,
) -> Result<Vec<AccessGrant>, AgroError> {
    let broker = DbBroker::for_store(store);
    broker.with_conn(&store.db_path(), "agrotrace", "access.list", |conn| {
        let Some(key) = sqlint::lookup(data_id) else {
            return Ok(Vec::new());
        };
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM access_grants WHERE data_kind = ?1 AND data_id = ?2 ORDER BY accessor",
            GRANT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![data_kind, key], grant_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    })
}

pub fn run_access_cli(
    store: &Store,
    caller: &CallerArgs,
    cli: AccessCli,
) -> Result<serde_json::Value, AgroError> {
    match cli.command {
        AccessCommand::Grant {
            kind,
            id,
            accessor,
            level,
        } => {
            let accessor = Identity::new(&accessor)?;
            let ctx = caller.context(store)?;
            let granted = grant_access_tagged(store, &ctx, &kind, id, &accessor, &level)?;
            Ok(time::command_envelope(
                "access.grant",
                "ok",
                serde_json::json!({
                    "data_kind": kind,
                    "data_id": id,
                    "accessor": accessor,
                    "granted_by": ctx.caller,
                    "granted": granted
                }),
            ))
        }
        AccessCommand::Revoke { kind, id, accessor } => {
            let kind: RecordKind = kind.parse()?;
            let accessor = Identity::new(&accessor)?;
            let ctx = caller.context(store)?;
            let revoked = revoke_access(store, &ctx, kind, id, &accessor)?;
            Ok(time::command_envelope(
                "access.revoke",
                "ok",
                serde_json::json!({ "data_kind": kind, "data_id": id, "accessor": accessor, "revoked": revoked }),
            ))
        }
        AccessCommand::Check { kind, id, accessor } => {
            let kind: RecordKind = kind.parse()?;
            let accessor = Identity::new(&accessor)?;
            let grant = check_access(store, kind, id, &accessor)?;
            Ok(time::command_envelope(
                "access.check",
                if grant.is_some() { "ok" } else { "not_found" },
                serde_json::json!({ "data_kind": kind, "data_id": id, "accessor": accessor, "grant": grant }),
            ))
        }
        AccessCommand::List { kind, id } => {
            let kind: RecordKind = kind.parse()?;
            let grants = list_grants_for_record(store, kind, id)?;
            Ok(time::command_envelope(
                "access.list",
                "ok",
                serde_json::json!({ "data_kind": kind, "data_id": id, "count": grants.len(), "grants": grants }),
            ))
        }
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "access",
        "version": "0.1.0",
        "description": "Per-record access grants keyed by (kind, id, accessor)",
        "commands": [
            { "name": "grant", "parameters": ["kind", "id", "accessor", "level"], "errors": ["not_authorized", "not_found", "invalid_input"] },
            { "name": "revoke", "parameters": ["kind", "id", "accessor"], "errors": ["not_authorized", "not_found"] },
            { "name": "check", "parameters": ["kind", "id", "accessor"] },
            { "name": "list", "parameters": ["kind", "id"] }
        ],
        "storage": ["registry.db:access_grants"]
    })
}
