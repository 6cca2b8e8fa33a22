//! Authorization predicates consulted by every mutating operation.
//!
//! These read the registry tables directly and never write. The `require_*` forms turn a
//! failed predicate into the error each operation reports.

use crate::core::error::AgroError;
use crate::core::identity::Identity;
use crate::core::kinds::RecordKind;
use crate::core::sqlint;
use rusqlite::{Connection, OptionalExtension, params};

/// A farmer counts as registered only while `active` is set.
pub fn is_active_farmer(conn: &Connection, who: &Identity) -> Result<bool, AgroError> {
    let active: Option<bool> = conn
        .query_row(
            "SELECT active FROM farmers WHERE identity = ?1",
            params![who],
            |row| row.get(0),
        )
        .optional()?;
    Ok(active.unwrap_or(false))
}

pub fn is_active_verifier(conn: &Connection, who: &Identity) -> Result<bool, AgroError> {
    let active: Option<bool> = conn
        .query_row(
            "SELECT active FROM verifiers WHERE identity = ?1",
            params![who],
            |row| row.get(0),
        )
        .optional()?;
    Ok(active.unwrap_or(false))
}

/// Owner column of the record keyed by `id`. Ids above the storable range have no record.
fn owner_of(conn: &Connection, sql: &str, id: u64) -> Result<Option<Identity>, AgroError> {
    let Some(key) = sqlint::lookup(id) else {
        return Ok(None);
    };
    Ok(conn.query_row(sql, params![key], |row| row.get(0)).optional()?)
}

pub fn field_owner(conn: &Connection, field_id: u64) -> Result<Option<Identity>, AgroError> {
    owner_of(conn, "SELECT owner FROM fields WHERE field_id = ?1", field_id)
}

pub fn planting_owner(conn: &Connection, planting_id: u64) -> Result<Option<Identity>, AgroError> {
    owner_of(conn, "SELECT owner FROM plantings WHERE planting_id = ?1", planting_id)
}

pub fn harvest_owner(conn: &Connection, harvest_id: u64) -> Result<Option<Identity>, AgroError> {
    owner_of(conn, "SELECT owner FROM harvests WHERE harvest_id = ?1", harvest_id)
}

/// A missing field has no owner, so this is false for unknown ids.
pub fn is_field_owner(conn: &Connection, field_id: u64, who: &Identity) -> Result<bool, AgroError> {
    Ok(field_owner(conn, field_id)?.as_ref() == Some(who))
}

pub fn grant_issuer(
    conn: &Connection,
    kind: RecordKind,
    data_id: u64,
    accessor: &Identity,
) -> Result<Option<Identity>, AgroError> {
    let Some(key) = sqlint::lookup(data_id) else {
        return Ok(None);
    };
    Ok(conn
        .query_row(
            "SELECT granted_by FROM access_grants WHERE data_kind = ?1 AND data_id = ?2 AND accessor = ?3",
            params![kind, key, accessor],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn require_active_farmer(conn: &Connection, who: &Identity) -> Result<(), AgroError> {
    if !is_active_farmer(conn, who)? {
        return Err(AgroError::NotAuthorized(format!(
            "{} is not a registered farmer",
            who
        )));
    }
    Ok(())
}

pub fn require_field_owner(conn: &Connection, field_id: u64, who: &Identity) -> Result<(), AgroError> {
    if !is_field_owner(conn, field_id, who)? {
        return Err(AgroError::NotAuthorized(format!(
            "{} does not own field {}",
            who, field_id
        )));
    }
    Ok(())
}

pub fn require_active_verifier(conn: &Connection, who: &Identity) -> Result<(), AgroError> {
    if !is_active_verifier(conn, who)? {
        return Err(AgroError::NotVerifier(format!(
            "{} is not a registered verifier",
            who
        )));
    }
    Ok(())
}

/// Ownership rule for sharing a record.
///
/// Fields go through the field-ownership check, so an unknown field is `NotAuthorized`.
/// Plantings and harvests are fetched directly: unknown is `NotFound`, foreign is
/// `NotAuthorized`.
pub fn require_record_owner(
    conn: &Connection,
    kind: RecordKind,
    data_id: u64,
    who: &Identity,
) -> Result<(), AgroError> {
    let owner = match kind {
        RecordKind::Field => return require_field_owner(conn, data_id, who),
        RecordKind::Planting => planting_owner(conn, data_id)?,
        RecordKind::Harvest => harvest_owner(conn, data_id)?,
    };
    match owner {
        None => Err(AgroError::NotFound(format!("{} {} does not exist", kind, data_id))),
        Some(owner) if &owner != who => Err(AgroError::NotAuthorized(format!(
            "{} does not own {} {}",
            who, kind, data_id
        ))),
        Some(_) => Ok(()),
    }
}

/// Only the identity that issued a grant may revoke it.
pub fn require_granter(
    conn: &Connection,
    kind: RecordKind,
    data_id: u64,
    accessor: &Identity,
    who: &Identity,
) -> Result<(), AgroError> {
    match grant_issuer(conn, kind, data_id, accessor)? {
        None => Err(AgroError::NotFound(format!(
            "no grant on {} {} for {}",
            kind, data_id, accessor
        ))),
        Some(issuer) if &issuer != who => Err(AgroError::NotAuthorized(format!(
            "grant on {} {} for {} was issued by {}",
            kind, data_id, accessor, issuer
        ))),
        Some(_) => Ok(()),
    }
}
