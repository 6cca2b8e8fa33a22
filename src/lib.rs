//! Agrotrace: a provenance registry for agricultural records.
//!
//! Farmers register fields, record plantings on them and harvests from those plantings.
//! Independent verifiers attach attestations to any of those records, and owners grant
//! other identities access to individual records.
//!
//! # Architecture
//!
//! - Every operation takes an explicit [`core::identity::CallContext`]: the already
//!   authenticated caller plus a logical clock value stored as `registered_at`,
//!   `granted_at` or `verified_at`.
//! - All state lives in one SQLite database under `.agrotrace/`. Every call goes through
//!   [`core::broker::DbBroker`], which serializes calls and runs each mutation as a single
//!   transaction, so a rejected call writes nothing and consumes no id.
//! - [`core::guard`] holds the authorization predicates, [`core::allocator`] the four id
//!   counters.
//!
//! # Examples
//!
//! ```bash
//! agrotrace init
//! agrotrace --as farmer-a farmer register --name "Emma Green" --location "California, USA"
//! agrotrace --as farmer-a field register --location "Sunflower Valley" --size 50 --soil "Rich Loam"
//! agrotrace --as farmer-a access grant --kind field --id 1 --accessor buyer-c --level full
//! agrotrace access check --kind field --id 1 --accessor buyer-c
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: storage, identity, allocation, authorization and digest primitives
//! - [`plugins`]: the registry subsystems (farmers, fields, plantings, harvests, verifiers,
//!   access)

pub mod core;
pub mod plugins;
pub mod subsystems;

use crate::core::broker::DbBroker;
use crate::core::error::AgroError;
use crate::core::identity::CallerArgs;
use crate::core::store::{self as store_mod, STORE_DIR_NAME, Store};
use crate::core::{allocator, config, db, digest, time};
use clap::{Parser, Subcommand};
use plugins::{access, farmers, fields, harvests, plantings, verifiers};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "agrotrace",
    version = env!("CARGO_PKG_VERSION"),
    about = "Provenance registry for farms, fields, plantings and harvests"
)]
struct Cli {
    /// Project directory containing `.agrotrace/` (defaults to the nearest ancestor).
    #[clap(long, global = true)]
    root: Option<PathBuf>,
    /// Caller identity (overrides AGROTRACE_IDENTITY and the configured default).
    #[clap(long = "as", global = true)]
    identity: Option<String>,
    /// Logical clock value for this call (defaults to Unix seconds).
    #[clap(long, global = true)]
    at: Option<u64>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct InitCli {
    /// Directory to initialize (defaults to current working directory).
    #[clap(short, long)]
    dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct DataCli {
    #[clap(subcommand)]
    command: DataCommand,
}

#[derive(Subcommand, Debug)]
enum DataCommand {
    /// SHA-256 root over every registry table
    Digest,
    /// Next id for each counter
    Counters,
    /// Broker audit log
    Audit {
        #[clap(long)]
        actor: Option<String>,
    },
    /// Subsystem schemas and discovery
    Schema {
        #[clap(long)]
        subsystem: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create `.agrotrace/` with a default config and empty registry
    #[clap(name = "init")]
    Init(InitCli),

    /// Farmer identities
    #[clap(name = "farmer")]
    Farmer(farmers::FarmerCli),

    /// Fields owned by farmers
    #[clap(name = "field")]
    Field(fields::FieldCli),

    /// Planting events
    #[clap(name = "planting")]
    Planting(plantings::PlantingCli),

    /// Harvest events
    #[clap(name = "harvest")]
    Harvest(harvests::HarvestCli),

    /// Verifiers and attestations
    #[clap(name = "verifier")]
    Verifier(verifiers::VerifierCli),

    /// Per-record access grants
    #[clap(name = "access")]
    Access(access::AccessCli),

    /// Registry-wide views: digest, counters, audit, schemas
    #[clap(name = "data")]
    Data(DataCli),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Init(_) => "init",
            Command::Farmer(_) => "farmer",
            Command::Field(_) => "field",
            Command::Planting(_) => "planting",
            Command::Harvest(_) => "harvest",
            Command::Verifier(_) => "verifier",
            Command::Access(_) => "access",
            Command::Data(_) => "data",
        }
    }
}

/// Error envelope printed in place of a command result.
pub fn error_envelope(cmd: &str, err: &AgroError) -> serde_json::Value {
    time::command_envelope(
        cmd,
        "error",
        serde_json::json!({
            "error": {
                "code": err.code(),
                "kind": err.kind(),
                "message": err.to_string()
            }
        }),
    )
}

fn init_store(dir: Option<PathBuf>) -> Result<serde_json::Value, AgroError> {
    let target_dir = match dir {
        Some(d) => d,
        None => std::env::current_dir()?,
    };
    let store_root = target_dir.join(STORE_DIR_NAME);
    std::fs::create_dir_all(&store_root)?;
    let config_path = config::write_default_config(&store_root)?;
    let store = Store::open(&store_root)?;
    db::initialize_registry_db(&store)?;
    Ok(time::command_envelope(
        "init",
        "ok",
        serde_json::json!({
            "store": store.root,
            "db": store.db_path(),
            "config": config_path
        }),
    ))
}

fn open_store(root: Option<PathBuf>) -> Result<Store, AgroError> {
    let store_root = match root {
        Some(project) => project.join(STORE_DIR_NAME),
        None => store_mod::find_store_root(&std::env::current_dir()?)?,
    };
    if !store_root.is_dir() {
        return Err(AgroError::NotFound(format!(
            "{} does not exist. Run `agrotrace init` first.",
            store_root.display()
        )));
    }
    let store = Store::open(&store_root)?;
    db::initialize_registry_db(&store)?;
    Ok(store)
}

fn run_data_cli(store: &Store, cli: DataCli) -> Result<serde_json::Value, AgroError> {
    match cli.command {
        DataCommand::Digest => {
            let digest = digest::registry_digest(store)?;
            Ok(time::command_envelope(
                "data.digest",
                "ok",
                serde_json::json!({ "digest": digest }),
            ))
        }
        DataCommand::Counters => {
            let broker = DbBroker::for_store(store);
            let counters = broker.with_conn(&store.db_path(), "agrotrace", "counters.snapshot", |conn| {
                allocator::snapshot(conn)
            })?;
            Ok(time::command_envelope(
                "data.counters",
                "ok",
                serde_json::json!({ "counters": counters }),
            ))
        }
        DataCommand::Audit { actor } => {
            let broker = DbBroker::for_store(store);
            let events: Vec<_> = broker
                .read_events()?
                .into_iter()
                .filter(|ev| actor.as_deref().is_none_or(|a| a == ev.actor))
                .collect();
            Ok(time::command_envelope(
                "data.audit",
                "ok",
                serde_json::json!({ "count": events.len(), "events": events }),
            ))
        }
        DataCommand::Schema { subsystem } => {
            let schemas = subsystems::all_schemas(subsystem.as_deref());
            if schemas.is_empty() {
                return Err(AgroError::NotFound(format!(
                    "no subsystem named '{}'",
                    subsystem.unwrap_or_default()
                )));
            }
            Ok(time::command_envelope(
                "data.schema",
                "ok",
                serde_json::json!({ "subsystems": schemas }),
            ))
        }
    }
}

fn dispatch(cli: Cli) -> Result<serde_json::Value, AgroError> {
    let Cli {
        root,
        identity,
        at,
        command,
    } = cli;
    let caller = CallerArgs::from_env(identity, at);
    match command {
        Command::Init(init) => init_store(init.dir.or(root)),
        Command::Farmer(c) => farmers::run_farmer_cli(&open_store(root)?, &caller, c),
        Command::Field(c) => fields::run_field_cli(&open_store(root)?, &caller, c),
        Command::Planting(c) => plantings::run_planting_cli(&open_store(root)?, &caller, c),
        Command::Harvest(c) => harvests::run_harvest_cli(&open_store(root)?, &caller, c),
        Command::Verifier(c) => verifiers::run_verifier_cli(&open_store(root)?, &caller, c),
        Command::Access(c) => access::run_access_cli(&open_store(root)?, &caller, c),
        Command::Data(c) => run_data_cli(&open_store(root)?, c),
    }
}

/// Parses the command line, runs one command and prints its JSON envelope.
///
/// Failures are printed as an error envelope as well, then returned so the binary can pick
/// an exit code.
pub fn run() -> Result<(), AgroError> {
    let cli = Cli::parse();
    let cmd = cli.command.name();
    match dispatch(cli) {
        Ok(envelope) => {
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(())
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&error_envelope(cmd, &err))?);
            Err(err)
        }
    }
}
