//! Caller identity and the per-operation context handed to every mutator.
//!
//! Identities arrive already authenticated; this module only checks their shape.

use crate::core::error::AgroError;
use crate::core::store::Store;
use crate::core::time;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

pub const IDENTITY_ENV_VAR: &str = "AGROTRACE_IDENTITY";

static IDENTITY_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._:@-]{0,127}$").expect("identity pattern compiles")
});

/// Opaque authenticated principal: a farmer, a verifier, or an accessor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    pub fn new(raw: &str) -> Result<Self, AgroError> {
        if !IDENTITY_RE.is_match(raw) {
            return Err(AgroError::InvalidInput(format!(
                "identity '{}' must be 1-128 chars of [A-Za-z0-9._:@-] starting alphanumeric",
                raw
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identity {
    type Err = AgroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identity::new(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = AgroError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identity::new(&value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

impl ToSql for Identity {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for Identity {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        Identity::new(raw).map_err(|e| FromSqlError::Other(e.to_string().into()))
    }
}

/// Who is calling, and at which logical clock value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Identity,
    /// Monotonic logical clock recorded as registered_at / granted_at / verified_at.
    pub at: u64,
}

impl CallContext {
    pub fn new(caller: Identity, at: u64) -> Self {
        Self { caller, at }
    }
}

/// Picks the caller identity: explicit flag, then environment, then configured default.
pub fn resolve_identity(
    flag: Option<&str>,
    env_value: Option<&str>,
    configured: Option<&str>,
) -> Result<Identity, AgroError> {
    match flag.or(env_value).or(configured) {
        Some(raw) => Identity::new(raw),
        None => Err(AgroError::InvalidInput(format!(
            "no caller identity: pass --as, set {}, or set default_identity in config.toml",
            IDENTITY_ENV_VAR
        ))),
    }
}

/// Raw caller inputs gathered by the CLI, resolved lazily so read-only commands need none.
#[derive(Debug, Clone, Default)]
pub struct CallerArgs {
    pub identity_flag: Option<String>,
    pub identity_env: Option<String>,
    pub at: Option<u64>,
}

impl CallerArgs {
    pub fn from_env(identity_flag: Option<String>, at: Option<u64>) -> Self {
        Self {
            identity_flag,
            identity_env: std::env::var(IDENTITY_ENV_VAR).ok().filter(|v| !v.is_empty()),
            at,
        }
    }

    /// Builds the context for one mutating call. Without `--at` the clock is Unix seconds.
    pub fn context(&self, store: &Store) -> Result<CallContext, AgroError> {
        let caller = resolve_identity(
            self.identity_flag.as_deref(),
            self.identity_env.as_deref(),
            store.config.default_identity.as_deref(),
        )?;
        let at = self.at.unwrap_or_else(time::now_epoch_secs);
        Ok(CallContext::new(caller, at))
    }
}
