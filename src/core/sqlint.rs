//! Unsigned registry values at the SQLite boundary.
//!
//! Ids, sizes, yields and clock values are `u64` in the API but SQLite integers are signed,
//! so they are bound and read as `i64`. Values above `i64::MAX` are never stored.

use crate::core::error::AgroError;
use rusqlite::Row;

/// Converts a value that is about to be written. Out of range is `InvalidInput`.
pub fn to_column(attribute: &str, value: u64) -> Result<i64, AgroError> {
    i64::try_from(value).map_err(|_| {
        AgroError::InvalidInput(format!(
            "{} {} exceeds the largest storable value {}",
            attribute,
            value,
            i64::MAX
        ))
    })
}

/// Lookup key for an id. `None` means no record can have this id.
pub fn lookup(id: u64) -> Option<i64> {
    i64::try_from(id).ok()
}

/// Reads an unsigned column. A negative stored value is a conversion error.
pub fn from_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let raw: i64 = row.get(idx)?;
    u64::try_from(raw).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, raw))
}
