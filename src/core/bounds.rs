//! Length limits for free-text record attributes.

use crate::core::error::AgroError;

pub const MAX_NAME: usize = 100;
pub const MAX_LOCATION: usize = 100;
pub const MAX_SHORT_LABEL: usize = 50;
pub const MAX_DATE: usize = 32;
pub const MAX_QUALITY_METRICS: usize = 200;
pub const MAX_LONG_TEXT: usize = 500;

/// Fails with `InvalidInput` when `value` is longer than `max` characters.
pub fn check_text(attribute: &str, value: &str, max: usize) -> Result<(), AgroError> {
    let len = value.chars().count();
    if len > max {
        return Err(AgroError::InvalidInput(format!(
            "{} is {} characters; the limit is {}",
            attribute, len, max
        )));
    }
    Ok(())
}
