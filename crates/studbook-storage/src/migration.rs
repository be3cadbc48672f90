//! Versioned schema steps for the persistent backends
//!
//! A backend stores the number of the last step it applied. On open it
//! applies every later step in order, each one together with its new
//! version number, so an interrupted upgrade resumes where it stopped.

use crate::error::{StorageError, StorageResult};

/// One schema change, in the order it is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStep {
    /// Horse and owner tables plus the backend's bookkeeping table
    RegistryTables,
    /// Lookup support for `children_of` and owner email checks. SQLite
    /// indexes the parent and email columns; redb seeds its id counters.
    ParentLookups,
}

/// Every step, oldest first. A step's version is its position plus one.
pub const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep::RegistryTables, SchemaStep::ParentLookups];

/// Version a fully upgraded store reports
pub const CURRENT_VERSION: u32 = SCHEMA_STEPS.len() as u32;

impl SchemaStep {
    pub fn version(self) -> u32 {
        match self {
            Self::RegistryTables => 1,
            Self::ParentLookups => 2,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::RegistryTables => "horse and owner tables",
            Self::ParentLookups => "parent and email lookups",
        }
    }
}

/// Steps a store at `stored` still needs. A store written by a newer
/// release is refused rather than opened with a schema we do not know.
pub fn pending_steps(stored: u32) -> StorageResult<&'static [SchemaStep]> {
    if stored > CURRENT_VERSION {
        return Err(StorageError::Migration(format!(
            "Database schema version {} is newer than supported version {}",
            stored, CURRENT_VERSION
        )));
    }
    Ok(&SCHEMA_STEPS[stored as usize..])
}

/// A store whose schema is upgraded step by step
pub trait SchemaVersioned {
    /// Version recorded in the store; 0 for a fresh one
    fn stored_version(&self) -> StorageResult<u32>;

    /// Apply `step` and record `step.version()` in the same transaction
    fn apply_step(&self, step: SchemaStep) -> StorageResult<()>;
}

/// Bring `store` up to [`CURRENT_VERSION`], returning the version it started at
pub fn upgrade<B: SchemaVersioned + ?Sized>(store: &B) -> StorageResult<u32> {
    let stored = store.stored_version()?;
    let steps = pending_steps(stored)?;

    if steps.is_empty() {
        tracing::debug!("Schema already at version {}", stored);
        return Ok(stored);
    }

    for step in steps {
        store.apply_step(*step)?;
        tracing::info!("Applied schema step {}: {}", step.version(), step.description());
    }
    Ok(stored)
}
