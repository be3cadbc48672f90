//! Studbook Core - Pedigree engine for a horse registry
//!
//! This crate provides the data model, field validation, the pedigree
//! validator and the lineage tree assembler. Storage lives in
//! `studbook-storage`.

pub mod error;
pub mod horse;
pub mod lineage;
pub mod owner;
pub mod pedigree;
pub mod query;
pub mod validation;

pub use error::{Error, Result};
pub use horse::{Horse, HorseDraft, HorseFields, HorseId, Sex};
pub use lineage::{build_tree, AncestorRow, LineageAssembler, LineageNode, DEFAULT_GENERATIONS};
pub use owner::{Owner, OwnerDraft, OwnerFields, OwnerId};
pub use pedigree::{
    Conflict, ConflictReport, HorseGraph, OwnerDirectory, ParentRole, PedigreeValidator,
};
pub use query::{HorseSearch, OwnerSearch};
pub use validation::FieldError;
