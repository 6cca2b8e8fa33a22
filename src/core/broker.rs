use crate::core::db;
use crate::core::error::AgroError;
use crate::core::store::Store;
use crate::core::time;
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

pub const AUDIT_LOG_NAME: &str = "broker.events.jsonl";

/// The DB Broker is the single door to registry state.
///
/// Every call takes one process-wide lock, so operations run one at a time and each sees
/// the effects of all earlier ones. Mutations additionally run inside a `BEGIN IMMEDIATE`
/// transaction that commits only when the closure returns `Ok`; an `Err` rolls back, which
/// is what keeps failed calls from writing records or consuming ids.
pub struct DbBroker {
    audit_log_path: PathBuf,
    audit_enabled: bool,
    busy_timeout: Duration,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub db_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
}

static DB_LOCK: Mutex<()> = Mutex::new(());

impl DbBroker {
    pub fn for_store(store: &Store) -> Self {
        Self {
            audit_log_path: store.root.join(AUDIT_LOG_NAME),
            audit_enabled: store.config.audit_log,
            busy_timeout: Duration::from_secs(store.config.busy_timeout_secs),
        }
    }

    pub fn audit_log_path(&self) -> &Path {
        &self.audit_log_path
    }

    /// Run a read-only closure against the database under the broker lock.
    pub fn with_conn<F, R>(&self, db_path: &Path, actor: &str, op_name: &str, f: F) -> Result<R, AgroError>
    where
        F: FnOnce(&Connection) -> Result<R, AgroError>,
    {
        let _lock = DB_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let conn = db::db_connect(&db_path.to_string_lossy(), self.busy_timeout)?;
        let result = f(&conn);
        self.record(db_path, actor, op_name, &result);
        result
    }

    /// Run a mutating closure as one atomic unit.
    pub fn with_tx<F, R>(&self, db_path: &Path, actor: &str, op_name: &str, f: F) -> Result<R, AgroError>
    where
        F: FnOnce(&Connection) -> Result<R, AgroError>,
    {
        let _lock = DB_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let result = self.run_tx(db_path, f);
        self.record(db_path, actor, op_name, &result);
        result
    }

    fn run_tx<F, R>(&self, db_path: &Path, f: F) -> Result<R, AgroError>
    where
        F: FnOnce(&Connection) -> Result<R, AgroError>,
    {
        let mut conn = db::db_connect(&db_path.to_string_lossy(), self.busy_timeout)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn record<R>(&self, db_path: &Path, actor: &str, op: &str, result: &Result<R, AgroError>) {
        if !self.audit_enabled {
            return;
        }
        let db_id = db_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let status = if result.is_ok() { "success" } else { "error" };
        let ev = BrokerEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            actor: actor.to_string(),
            op: op.to_string(),
            db_id,
            status: status.to_string(),
            code: result.as_ref().err().map(AgroError::code),
        };
        // The state change has already committed or rolled back; a lost audit line must not
        // turn a committed write into a reported failure.
        if let Err(e) = self.append_event(&ev) {
            eprintln!("agrotrace: audit log write failed: {}", e);
        }
    }

    fn append_event(&self, ev: &BrokerEvent) -> Result<(), AgroError> {
        use std::fs::OpenOptions;
        use std::io::Write;

        let line = serde_json::to_string(ev)?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log_path)?;
        writeln!(f, "{}", line)?;
        Ok(())
    }

    pub fn read_events(&self) -> Result<Vec<BrokerEvent>, AgroError> {
        if !self.audit_log_path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.audit_log_path)?;
        let mut out = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            out.push(serde_json::from_str(line)?);
        }
        Ok(out)
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "broker",
        "version": "0.1.0",
        "description": "Serialized, transactional access to registry state with a JSONL audit trail",
        "commands": [
            { "name": "audit", "description": "Show the audit log", "parameters": ["actor"] }
        ],
        "storage": [AUDIT_LOG_NAME]
    })
}
