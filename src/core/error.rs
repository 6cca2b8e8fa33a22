use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgroError {
    #[error("Not authorized: {0}")]
    NotAuthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid field: {0}")]
    InvalidField(String),
    #[error("Invalid planting: {0}")]
    InvalidPlanting(String),
    /// Reserved code; no registry path raises it.
    #[error("Field not planted: {0}")]
    FieldNotPlanted(String),
    #[error("Not a verifier: {0}")]
    NotVerifier(String),
    /// The on-disk registry layout is unreadable or newer than this build.
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl AgroError {
    /// Stable numeric code for registry outcomes. Infrastructure failures share 500.
    pub fn code(&self) -> u32 {
        match self {
            AgroError::NotAuthorized(_) => 100,
            AgroError::NotFound(_) => 101,
            AgroError::AlreadyExists(_) => 102,
            AgroError::InvalidInput(_) => 103,
            AgroError::InvalidField(_) => 104,
            AgroError::InvalidPlanting(_) => 105,
            AgroError::FieldNotPlanted(_) => 106,
            AgroError::NotVerifier(_) => 107,
            AgroError::SchemaError(_)
            | AgroError::RusqliteError(_)
            | AgroError::IoError(_)
            | AgroError::ConfigError(_)
            | AgroError::JsonError(_) => 500,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AgroError::NotAuthorized(_) => "not_authorized",
            AgroError::NotFound(_) => "not_found",
            AgroError::AlreadyExists(_) => "already_exists",
            AgroError::InvalidInput(_) => "invalid_input",
            AgroError::InvalidField(_) => "invalid_field",
            AgroError::InvalidPlanting(_) => "invalid_planting",
            AgroError::FieldNotPlanted(_) => "field_not_planted",
            AgroError::NotVerifier(_) => "not_verifier",
            AgroError::SchemaError(_) => "schema",
            AgroError::RusqliteError(_) => "sqlite",
            AgroError::IoError(_) => "io",
            AgroError::ConfigError(_) => "config",
            AgroError::JsonError(_) => "json",
        }
    }

    /// True for outcomes of the registry rules rather than storage or environment faults.
    pub fn is_domain(&self) -> bool {
        self.code() < 500
    }
}
