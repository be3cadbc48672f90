//! Studbook Storage - Graph store backends for the horse registry
//!
//! This crate provides different storage backends for persisting horses and
//! owners, plus the adapter that exposes a backend to the pedigree validator.

#![allow(clippy::result_large_err)]

pub mod error;
pub mod graph;
pub mod migration;
pub mod traits;

#[cfg(feature = "redb")]
pub mod redb;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod memory;

pub use error::{StorageError, StorageResult};
pub use graph::StoreGraph;
pub use migration::{SchemaStep, SchemaVersioned, CURRENT_VERSION};
pub use traits::StorageBackend;

#[cfg(feature = "redb")]
pub use redb::RedbStorage;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;

pub use memory::MemoryStorage;
