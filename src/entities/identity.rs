// 🔑 Identity - Surrogate keys and the new/existing split
//
// "An entity without an id has never been saved"
//
// Every record in the aggregate carries an optional surrogate key:
// - None  => new (never persisted)
// - Some  => existing (persisted at least once)
//
// The key is assigned by the store on save, never by the entity itself.

use serde::{Deserialize, Serialize};

/// Surrogate key assigned by the persistence layer
pub type EntityId = i64;

// ============================================================================
// IDENTITY STATE
// ============================================================================

/// Anything that carries an optional surrogate key
pub trait Identified {
    fn id(&self) -> Option<EntityId>;
}

/// True while the entity has never been saved
pub fn is_new<E: Identified + ?Sized>(entity: &E) -> bool {
    entity.id().is_none()
}

// ============================================================================
// PERSON NAME
// ============================================================================

/// First/last name fragment embedded by value into person-like records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonName {
    pub first_name: String,
    pub last_name: String,
}

impl PersonName {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        PersonName {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// "George Franklin"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl std::fmt::Display for PersonName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

// ============================================================================
// TESTS
// ============================================================================
