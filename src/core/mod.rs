//! Core modules shared by every registry subsystem.
//!
//! Storage plumbing (store, db, broker, schemas), caller identity, the id allocator, the
//! authorization guard, and the registry digest live here.

pub mod allocator;
pub mod bounds;
pub mod broker;
pub mod config;
pub mod db;
pub mod digest;
pub mod error;
pub mod guard;
pub mod identity;
pub mod kinds;
pub mod schemas;
pub mod sqlint;
pub mod store;
pub mod time;
