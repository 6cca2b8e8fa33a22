//! Closed enumerations that the registry stores as text columns.
//!
//! Parsing from a string is the only place an unknown tag can enter, and it fails with
//! `InvalidInput` before any state is read.

use crate::core::error::AgroError;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Record kinds that can be attested or shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Field,
    Planting,
    Harvest,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::Field, RecordKind::Planting, RecordKind::Harvest];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Field => "field",
            RecordKind::Planting => "planting",
            RecordKind::Harvest => "harvest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessLevel {
    Full,
    Limited,
    MetadataOnly,
}

impl AccessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Full => "full",
            AccessLevel::Limited => "limited",
            AccessLevel::MetadataOnly => "metadata-only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Verified,
    Rejected,
    Pending,
}

impl VerificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
            VerificationStatus::Pending => "pending",
        }
    }
}

impl FromStr for RecordKind {
    type Err = AgroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "field" => Ok(RecordKind::Field),
            "planting" => Ok(RecordKind::Planting),
            "harvest" => Ok(RecordKind::Harvest),
            other => Err(AgroError::InvalidInput(format!(
                "unknown record kind '{}' (expected field, planting or harvest)",
                other
            ))),
        }
    }
}

impl FromStr for AccessLevel {
    type Err = AgroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(AccessLevel::Full),
            "limited" => Ok(AccessLevel::Limited),
            "metadata-only" => Ok(AccessLevel::MetadataOnly),
            other => Err(AgroError::InvalidInput(format!(
                "unknown access level '{}' (expected full, limited or metadata-only)",
                other
            ))),
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = AgroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verified" => Ok(VerificationStatus::Verified),
            "rejected" => Ok(VerificationStatus::Rejected),
            "pending" => Ok(VerificationStatus::Pending),
            other => Err(AgroError::InvalidInput(format!(
                "unknown verification status '{}' (expected verified, rejected or pending)",
                other
            ))),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn column_tag<T: FromStr<Err = AgroError>>(value: ValueRef<'_>) -> FromSqlResult<T> {
    value
        .as_str()?
        .parse()
        .map_err(|e: AgroError| FromSqlError::Other(e.to_string().into()))
}

impl ToSql for RecordKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RecordKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        column_tag(value)
    }
}

impl ToSql for AccessLevel {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AccessLevel {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        column_tag(value)
    }
}

impl ToSql for VerificationStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for VerificationStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        column_tag(value)
    }
}
