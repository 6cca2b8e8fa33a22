//! Verifier registry and the attestation log.
//!
//! Attestations name a target by `(RecordKind, id)` and are stored whether or not that
//! record exists.

use crate::core::allocator::{self, CounterKind};
use crate::core::bounds;
use crate::core::broker::DbBroker;
use crate::core::error::AgroError;
use crate::core::guard;
use crate::core::identity::{CallContext, CallerArgs, Identity};
use crate::core::kinds::{RecordKind, VerificationStatus};
use crate::core::schemas;
use crate::core::sqlint;
use crate::core::store::Store;
use crate::core::time;
use clap::{Parser, Subcommand};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[clap(name = "verifier", about = "Register verifiers and submit attestations")]
pub struct VerifierCli {
    #[clap(subcommand)]
    pub command: VerifierCommand,
}

#[derive(Subcommand, Debug)]
pub enum VerifierCommand {
    /// Register the calling identity as a verifier.
    Register {
        #[clap(long)]
        name: String,
        #[clap(long = "type")]
        verification_type: String,
    },
    /// Show a verifier record.
    Get {
        #[clap(long)]
        id: String,
    },
    /// Attest to the status of a field, planting or harvest.
    Submit {
        #[clap(long)]
        kind: String,
        #[clap(long)]
        target: u64,
        #[clap(long)]
        status: String,
        #[clap(long, default_value = "")]
        comments: String,
    },
    /// Show an attestation.
    Show {
        #[clap(long)]
        id: u64,
    },
    /// List attestations about one record.
    List {
        #[clap(long)]
        kind: String,
        #[clap(long)]
        target: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verifier {
    pub identity: Identity,
    pub name: String,
    pub verification_type: String,
    pub registered_at: u64,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub verification_id: u64,
    pub verifier: Identity,
    pub target_kind: RecordKind,
    pub target_id: u64,
    pub verified_at: u64,
    pub status: VerificationStatus,
    pub comments: String,
}

const VERIFICATION_COLUMNS: &str =
    "verification_id, verifier, target_kind, target_id, verified_at, status, comments";

fn verifier_from_row(row: &Row<'_>) -> rusqlite::Result<Verifier> {
    Ok(Verifier {
        identity: row.get(0)?,
        name: row.get(1)?,
        verification_type: row.get(2)?,
        registered_at: sqlint::from_column(row, 3)?,
        active: row.get(4)?,
    })
}

fn verification_from_row(row: &Row<'_>) -> rusqlite::Result<Verification> {
    Ok(Verification {
        verification_id: sqlint::from_column(row, 0)?,
        verifier: row.get(1)?,
        target_kind: row.get(2)?,
        target_id: sqlint::from_column(row, 3)?,
        verified_at: sqlint::from_column(row, 4)?,
        status: row.get(5)?,
        comments: row.get(6)?,
    })
}

pub fn initialize_verifiers_schema(conn: &Connection) -> Result<(), AgroError> {
    conn.execute(schemas::VERIFIERS_SCHEMA, [])?;
    conn.execute(schemas::VERIFICATIONS_SCHEMA, [])?;
    conn.execute(schemas::VERIFICATIONS_TARGET_INDEX, [])?;
    Ok(())
}

/// Same rule as farmers: only an active record blocks re-registration.
pub fn register_verifier(
    store: &Store,
    ctx: &CallContext,
    name: &str,
    verification_type: &str,
) -> Result<bool, AgroError> {
    bounds::check_text("name", name, bounds::MAX_NAME)?;
    bounds::check_text("verification_type", verification_type, bounds::MAX_SHORT_LABEL)?;
    let at = sqlint::to_column("at", ctx.at)?;

    let broker = DbBroker::for_store(store);
    broker.with_tx(&store.db_path(), ctx.caller.as_str(), "verifier.register", |conn| {
        if guard::is_active_verifier(conn, &ctx.caller)? {
            return Err(AgroError::AlreadyExists(format!(
                "verifier {} is already registered",
                ctx.caller
            )));
        }
        conn.execute(
            "INSERT OR REPLACE INTO verifiers(identity, name, verification_type, registered_at, active)
             VALUES(?1, ?2, ?3, ?4, 1)",
            params![ctx.caller, name, verification_type, at],
        )?;
        Ok(true)
    })
}

pub fn submit_verification(
    store: &Store,
    ctx: &CallContext,
    target_kind: RecordKind,
    target_id: u64,
    status: VerificationStatus,
    comments: &str,
) -> Result<u64, AgroError> {
    bounds::check_text("comments", comments, bounds::MAX_LONG_TEXT)?;
    let target = sqlint::to_column("target_id", target_id)?;
    let at = sqlint::to_column("at", ctx.at)?;

    let broker = DbBroker::for_store(store);
    broker.with_tx(&store.db_path(), ctx.caller.as_str(), "verification.submit", |conn| {
        guard::require_active_verifier(conn, &ctx.caller)?;
        let verification_id = allocator::allocate(conn, CounterKind::Verification)?;
        conn.execute(
            "INSERT INTO verifications(verification_id, verifier, target_kind, target_id, verified_at, status, comments)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                sqlint::to_column("verification_id", verification_id)?,
                ctx.caller,
                target_kind,
                target,
                at,
                status,
                comments
            ],
        )?;
        Ok(verification_id)
    })
}

pub fn get_verifier(store: &Store, identity: &Identity) -> Result<Option<Verifier>, AgroError> {
    let broker = DbBroker::for_store(store);
    broker.with_conn(&store.db_path(), "agrotrace", "verifier.get", |conn| {
        Ok(conn
            .query_row(
                "SELECT identity, name, verification_type, registered_at, active FROM verifiers WHERE identity = ?1",
                params![identity],
                verifier_from_row,
            )
            .optional()?)
    })
}

pub fn get_verification(store: &Store, verification_id: u64) -> Result<Option<Verification>, AgroError> {
    let broker = DbBroker::for_store(store);
    broker.with_conn(&store.db_path(), "agrotrace", "verification.get", |conn| {
        let Some(key) = sqlint::lookup(verification_id) else {
            return Ok(None);
        };
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM verifications WHERE verification_id = ?1",
                    VERIFICATION_COLUMNS
                ),
                params![key],
                verification_from_row,
            )
            .optional()?)
    })
}

pub fn list_verifications_for_target(
    store: &Store,
    target_kind: RecordKind,
    target_id: u64,
) -> Result<Vec<Verification>, AgroError> {
    let broker = DbBroker::for_store(store);
    broker.with_conn(&store.db_path(), "agrotrace", "verification.list", |conn| {
        let Some(key) = sqlint::lookup(target_id) else {
            return Ok(Vec::new());
        };
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM verifications WHERE target_kind = ?1 AND target_id = ?2 ORDER BY verification_id",
            VERIFICATION_COLUMNS
        ))?;
        let rows = stmt.query_map(params![target_kind, key], verification_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    })
}

pub fn run_verifier_cli(
    store: &Store,
    caller: &CallerArgs,
    cli: VerifierCli,
) -> Result<serde_json::Value, AgroError> {
    match cli.command {
        VerifierCommand::Register {
            name,
            verification_type,
        } => {
            let ctx = caller.context(store)?;
            let registered = register_verifier(store, &ctx, &name, &verification_type)?;
            Ok(time::command_envelope(
                "verifier.register",
                "ok",
                serde_json::json!({ "identity": ctx.caller, "registered": registered, "at": ctx.at }),
            ))
        }
        VerifierCommand::Get { id } => {
            let identity = Identity::new(&id)?;
            let verifier = get_verifier(store, &identity)?;
            Ok(time::command_envelope(
                "verifier.get",
                if verifier.is_some() { "ok" } else { "not_found" },
                serde_json::json!({ "identity": identity, "verifier": verifier }),
            ))
        }
        VerifierCommand::Submit {
            kind,
            target,
            status,
            comments,
        } => {
            let kind: RecordKind = kind.parse()?;
            let status: VerificationStatus = status.parse()?;
            let ctx = caller.context(store)?;
            let verification_id =
                submit_verification(store, &ctx, kind, target, status, &comments)?;
            Ok(time::command_envelope(
                "verification.submit",
                "ok",
                serde_json::json!({
                    "verification_id": verification_id,
                    "target_kind": kind,
                    "target_id": target,
                    "verification_status": status
                }),
            ))
        }
        VerifierCommand::Show { id } => {
            let verification = get_verification(store, id)?;
            Ok(time::command_envelope(
                "verification.get",
                if verification.is_some() { "ok" } else { "not_found" },
                serde_json::json!({ "verification_id": id, "verification": verification }),
            ))
        }
        VerifierCommand::List { kind, target } => {
            let kind: RecordKind = kind.parse()?;
            let verifications = list_verifications_for_target(store, kind, target)?;
            Ok(time::command_envelope(
                "verification.list",
                "ok",
                serde_json::json!({
                    "target_kind": kind,
                    "target_id": target,
                    "count": verifications.len(),
                    "verifications": verifications
                }),
            ))
        }
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "verifier",
        "version": "0.1.0",
        "description": "Third-party verifiers and their attestations about registry records",
        "commands": [
            { "name": "register", "parameters": ["name", "type"], "errors": ["already_exists"] },
            { "name": "get", "parameters": ["id"] },
            { "name": "submit", "parameters": ["kind", "target", "status", "comments"], "errors": ["not_verifier", "invalid_input"] },
            { "name": "show", "parameters": ["id"] },
            { "name": "list", "parameters": ["kind", "target"] }
        ],
        "storage": ["registry.db:verifiers", "registry.db:verifications", "registry.db:counters"]
    })
}
