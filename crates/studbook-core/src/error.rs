//! Error types for Studbook Core

use crate::horse::HorseId;
use crate::owner::OwnerId;
use crate::pedigree::ConflictReport;
use crate::validation::FieldError;
use thiserror::Error;

/// Result type alias using Studbook's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Studbook error types
///
/// Variants are listed in precedence order: field errors pre-empt conflicts,
/// and both are reported in full rather than stopping at the first problem.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<FieldError>),

    #[error("Conflict with stored data: {0}")]
    Conflict(ConflictReport),

    #[error("No horse with ID {0} found")]
    HorseNotFound(HorseId),

    #[error("No owner with ID {0} found")]
    OwnerNotFound(OwnerId),

    #[error("Number of generations must be at least 1, got {0}")]
    InvalidGenerations(i64),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored record violates an invariant that validation should have
    /// made impossible. Never caused by the current request.
    #[error("Internal error: {0}")]
    Fatal(String),
}

impl Error {
    /// Human-readable messages for every accumulated problem
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Validation(errors) => errors.iter().map(ToString::to_string).collect(),
            Self::Conflict(report) => report.messages(),
            other => vec![other.to_string()],
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::HorseNotFound(_) | Self::OwnerNotFound(_))
    }
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
