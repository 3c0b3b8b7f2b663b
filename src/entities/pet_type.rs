// 🏷️ Pet Type Entity - Shared, open-ended classification of pets
//
// Pet types are shared by every pet in the system. The set is open:
// a name that resolves to nothing can become a new (unsaved) type.
//
// The registry is the text round-trip used by forms:
// - render:  PetType -> display name
// - resolve: display name -> PetType (exact match)

use crate::entities::identity::{EntityId, Identified};
use serde::{Deserialize, Serialize};

// ============================================================================
// PET TYPE ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetType {
    /// Surrogate key (None until saved)
    #[serde(default)]
    pub id: Option<EntityId>,

    /// Display name (e.g., "cat", "dog", "lizard")
    pub name: String,
}

impl PetType {
    /// Create an unsaved pet type
    pub fn new(name: impl Into<String>) -> Self {
        PetType {
            id: None,
            name: name.into(),
        }
    }

    /// Create a pet type that already has a key
    pub fn with_id(id: EntityId, name: impl Into<String>) -> Self {
        PetType {
            id: Some(id),
            name: name.into(),
        }
    }
}

impl Identified for PetType {
    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

impl std::fmt::Display for PetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Names seeded into an empty store
pub const DEFAULT_PET_TYPES: [&str; 6] = ["bird", "cat", "dog", "hamster", "lizard", "snake"];

// ============================================================================
// PET TYPE REGISTRY
// ============================================================================

/// Snapshot of the known pet types, sorted by name
#[derive(Debug, Clone, Default)]
pub struct PetTypeRegistry {
    types: Vec<PetType>,
}

impl PetTypeRegistry {
    /// Build from any list; the registry keeps it sorted by name
    pub fn new(mut types: Vec<PetType>) -> Self {
        types.sort_by(|a, b| a.name.cmp(&b.name));
        PetTypeRegistry { types }
    }

    /// Display name of a pet type
    pub fn render(pet_type: &PetType) -> &str {
        &pet_type.name
    }

    /// Find the pet type whose name equals `name` exactly
    pub fn resolve(&self, name: &str) -> Option<&PetType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Resolve `name`, or hand back a new unsaved type carrying it
    pub fn resolve_or_new(&self, name: &str) -> PetType {
        self.resolve(name)
            .cloned()
            .unwrap_or_else(|| PetType::new(name))
    }

    pub fn all(&self) -> &[PetType] {
        &self.types
    }
}

// ============================================================================
// TESTS
// ============================================================================
