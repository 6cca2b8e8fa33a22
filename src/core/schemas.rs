//! Database schema definitions for the registry.
//!
//! Every table lives in the single registry database (`registry.db` by default) so a
//! record write and its counter bump commit in one transaction.
//! 1. Entity registry: farmers, fields, plantings, harvests.
//! 2. Verifier registry and attestation log: verifiers, verifications.
//! 3. Access control ledger: access_grants.
//! 4. Id allocation: counters.

pub const REGISTRY_SCHEMA_VERSION: u32 = 1;

// --- 1. Entity registry ---
pub const FARMERS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS farmers (
        identity TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        location TEXT NOT NULL,
        registered_at INTEGER NOT NULL,
        active INTEGER NOT NULL
    )
";

pub const FIELDS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS fields (
        field_id INTEGER PRIMARY KEY,
        owner TEXT NOT NULL,
        location TEXT NOT NULL,
        size_hectares INTEGER NOT NULL,
        soil_type TEXT NOT NULL,
        registered_at INTEGER NOT NULL,
        active INTEGER NOT NULL
    )
";
pub const FIELDS_OWNER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_fields_owner ON fields(owner)";

// field_id is deliberately not a foreign key: plantings are never revalidated.
pub const PLANTINGS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS plantings (
        planting_id INTEGER PRIMARY KEY,
        field_id INTEGER NOT NULL,
        owner TEXT NOT NULL,
        crop_type TEXT NOT NULL,
        planting_date TEXT NOT NULL,
        inputs_used TEXT NOT NULL,
        notes TEXT NOT NULL
    )
";
pub const PLANTINGS_FIELD_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_plantings_field ON plantings(field_id)";

pub const HARVESTS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS harvests (
        harvest_id INTEGER PRIMARY KEY,
        planting_id INTEGER NOT NULL,
        field_id INTEGER NOT NULL,
        owner TEXT NOT NULL,
        yield_amount INTEGER NOT NULL,
        quality_metrics TEXT NOT NULL,
        harvest_date TEXT NOT NULL,
        notes TEXT NOT NULL
    )
";
pub const HARVESTS_PLANTING_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_harvests_planting ON harvests(planting_id)";

// --- 2. Verifiers and attestations ---
pub const VERIFIERS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS verifiers (
        identity TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        verification_type TEXT NOT NULL,
        registered_at INTEGER NOT NULL,
        active INTEGER NOT NULL
    )
";

// (target_kind, target_id) may point at a record that does not exist.
pub const VERIFICATIONS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS verifications (
        verification_id INTEGER PRIMARY KEY,
        verifier TEXT NOT NULL,
        target_kind TEXT NOT NULL CHECK (target_kind IN ('field', 'planting', 'harvest')),
        target_id INTEGER NOT NULL,
        verified_at INTEGER NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('verified', 'rejected', 'pending')),
        comments TEXT NOT NULL
    )
";
pub const VERIFICATIONS_TARGET_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_verifications_target ON verifications(target_kind, target_id)";

// --- 3. Access control ledger ---
pub const ACCESS_GRANTS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS access_grants (
        data_kind TEXT NOT NULL CHECK (data_kind IN ('field', 'planting', 'harvest')),
        data_id INTEGER NOT NULL,
        accessor TEXT NOT NULL,
        granted_by TEXT NOT NULL,
        granted_at INTEGER NOT NULL,
        access_level TEXT NOT NULL CHECK (access_level IN ('full', 'limited', 'metadata-only')),
        PRIMARY KEY (data_kind, data_id, accessor)
    )
";

// --- 4. Id allocation ---
pub const COUNTERS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS counters (
        kind TEXT PRIMARY KEY,
        next_id INTEGER NOT NULL CHECK (next_id >= 1)
    )
";
pub const COUNTERS_SEED: &str = "
    INSERT OR IGNORE INTO counters(kind, next_id)
    VALUES ('field', 1), ('planting', 1), ('harvest', 1), ('verification', 1)
";

pub const META_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";
