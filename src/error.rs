// ⚠️ Error taxonomy
//
// Only failures that abort an operation live here. Bad user input is not an
// error: validators return field rejections (see validation.rs) and the
// service hands them back as `FormOutcome::Rejected`.

use crate::entities::EntityId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClinicError {
    /// An id in the request does not resolve to a stored record
    #[error("{entity} not found with id: {id}")]
    InvalidReference { entity: &'static str, id: EntityId },

    /// A required id or payload is missing (caller defect)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClinicError {
    pub fn owner_not_found(id: EntityId) -> Self {
        ClinicError::InvalidReference { entity: "Owner", id }
    }

    pub fn pet_not_found(id: EntityId) -> Self {
        ClinicError::InvalidReference { entity: "Pet", id }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ClinicError::InvalidArgument(message.into())
    }

    pub fn is_invalid_reference(&self) -> bool {
        matches!(self, ClinicError::InvalidReference { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClinicError>;
