//! Registry subsystems: entity records, verifiers and attestations, and access grants.

pub mod access;
pub mod farmers;
pub mod fields;
pub mod harvests;
pub mod plantings;
pub mod verifiers;
