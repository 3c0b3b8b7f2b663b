// 🐾 Pet Entity - A tracked animal and its visit history
//
// A pet belongs to exactly one owner by containment: it lives inside the
// owner's pet list and has no pointer back. Its visits live inside it the
// same way.
//
// Visit order: ascending by date, ties keep insertion order.

use crate::entities::identity::{EntityId, Identified};
use crate::entities::pet_type::PetType;
use crate::entities::visit::Visit;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// PET ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    /// Surrogate key (None until saved)
    #[serde(default)]
    pub id: Option<EntityId>,

    /// Name, unique per owner (case-insensitive) once saved
    #[serde(default)]
    pub name: String,

    /// Must not be after today
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,

    /// Required for new pets
    #[serde(default, rename = "type")]
    pub pet_type: Option<PetType>,

    #[serde(default, deserialize_with = "deserialize_visits")]
    visits: Vec<Visit>,
}

impl Pet {
    /// Create an unsaved pet with no visits
    pub fn new(
        name: impl Into<String>,
        birth_date: Option<NaiveDate>,
        pet_type: Option<PetType>,
    ) -> Self {
        Pet {
            id: None,
            name: name.into(),
            birth_date,
            pet_type,
            visits: Vec::new(),
        }
    }

    /// Builder-style key assignment, mostly for loading and tests
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    /// Visits in date order
    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    /// Mutable access for the store when assigning keys; order must not change
    pub(crate) fn visits_mut(&mut self) -> &mut [Visit] {
        &mut self.visits
    }

    /// Insert a visit after every visit on the same or an earlier date
    pub fn add_visit(&mut self, visit: Visit) {
        let pos = self.visits.partition_point(|v| v.date <= visit.date);
        self.visits.insert(pos, visit);
    }

    /// Drop a saved visit from the history
    pub fn remove_visit(&mut self, visit_id: EntityId) -> Option<Visit> {
        let pos = self.visits.iter().position(|v| v.id == Some(visit_id))?;
        Some(self.visits.remove(pos))
    }

    /// Copy the editable fields from `other`, keeping key and visits
    pub(crate) fn copy_details_from(&mut self, other: Pet) {
        self.name = other.name;
        self.birth_date = other.birth_date;
        self.pet_type = other.pet_type;
    }

    /// Name of the pet type, if any
    pub fn type_name(&self) -> Option<&str> {
        self.pet_type.as_ref().map(|t| t.name.as_str())
    }
}

impl Identified for Pet {
    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

/// Incoming visit lists are re-ordered the same way `add_visit` orders them
fn deserialize_visits<'de, D>(deserializer: D) -> Result<Vec<Visit>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut visits = Vec::<Visit>::deserialize(deserializer)?;
    visits.sort_by_key(|v| v.date);
    Ok(visits)
}

// ============================================================================
// TESTS
// ============================================================================
