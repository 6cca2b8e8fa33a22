//! Monotonic id allocation for fields, plantings, harvests and verifications.
//!
//! Counters live in the `counters` table of the registry database. `allocate` must be called
//! on the same transaction as the insert it numbers, so a rolled-back call gives its id back.

use crate::core::error::AgroError;
use crate::core::schemas;
use crate::core::sqlint;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKind {
    Field,
    Planting,
    Harvest,
    Verification,
}

impl CounterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CounterKind::Field => "field",
            CounterKind::Planting => "planting",
            CounterKind::Harvest => "harvest",
            CounterKind::Verification => "verification",
        }
    }
}

/// Next id each counter will hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub next_field_id: u64,
    pub next_planting_id: u64,
    pub next_harvest_id: u64,
    pub next_verification_id: u64,
}

pub fn initialize_counters(conn: &Connection) -> Result<(), AgroError> {
    conn.execute(schemas::COUNTERS_SCHEMA, [])?;
    conn.execute(schemas::COUNTERS_SEED, [])?;
    Ok(())
}

/// Returns the id the next `allocate(kind)` will produce, without consuming it.
pub fn peek(conn: &Connection, kind: CounterKind) -> Result<u64, AgroError> {
    let next: Option<u64> = conn
        .query_row(
            "SELECT next_id FROM counters WHERE kind = ?1",
            params![kind.as_str()],
            |row| sqlint::from_column(row, 0),
        )
        .optional()?;
    Ok(next.unwrap_or(1))
}

/// Hands out the counter's current value and advances it by one.
pub fn allocate(conn: &Connection, kind: CounterKind) -> Result<u64, AgroError> {
    let id = peek(conn, kind)?;
    let next = id
        .checked_add(1)
        .and_then(sqlint::lookup)
        .ok_or_else(|| AgroError::InvalidInput(format!("{} counter exhausted", kind.as_str())))?;
    conn.execute(
        "INSERT INTO counters(kind, next_id) VALUES(?1, ?2)
         ON CONFLICT(kind) DO UPDATE SET next_id = excluded.next_id",
        params![kind.as_str(), next],
    )?;
    Ok(id)
}

pub fn snapshot(conn: &Connection) -> Result<CounterSnapshot, AgroError> {
    Ok(CounterSnapshot {
        next_field_id: peek(conn, CounterKind::Field)?,
        next_planting_id: peek(conn, CounterKind::Planting)?,
        next_harvest_id: peek(conn, CounterKind::Harvest)?,
        next_verification_id: peek(conn, CounterKind::Verification)?,
    })
}
