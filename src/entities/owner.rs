// 🏠 Owner Entity - Aggregate root
//
// An owner holds its pets by value, and each pet holds its visits by value.
// The store only ever sees the whole aggregate: load it, change it in memory,
// save it once. Deleting the owner deletes everything inside it.
//
// Pet order: by name, case-sensitive, ties keep insertion order.

use crate::entities::identity::{is_new, EntityId, Identified, PersonName};
use crate::entities::pet::Pet;
use crate::entities::visit::Visit;
use crate::error::{ClinicError, Result};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// OWNER ENTITY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    /// Surrogate key (None until saved)
    #[serde(default)]
    pub id: Option<EntityId>,

    #[serde(flatten)]
    pub name: PersonName,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub city: String,

    /// Exactly ten digits
    #[serde(default)]
    pub telephone: String,

    #[serde(default, deserialize_with = "deserialize_pets")]
    pets: Vec<Pet>,
}

/// Result of reconciling a submitted pet with the aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// An existing pet was updated in place
    Updated,
    /// The pet was new and is now attached
    Attached,
    /// The pet carried an unknown key and was left out
    Ignored,
}

impl Owner {
    /// Create an unsaved owner without pets
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        address: impl Into<String>,
        city: impl Into<String>,
        telephone: impl Into<String>,
    ) -> Self {
        Owner {
            id: None,
            name: PersonName::new(first_name, last_name),
            address: address.into(),
            city: city.into(),
            telephone: telephone.into(),
            pets: Vec::new(),
        }
    }

    pub fn first_name(&self) -> &str {
        &self.name.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.name.last_name
    }

    /// Pets in name order
    pub fn pets(&self) -> &[Pet] {
        &self.pets
    }

    /// Mutable access for the store when assigning keys; order must not change
    pub(crate) fn pets_mut(&mut self) -> &mut [Pet] {
        &mut self.pets
    }

    // ========================================================================
    // AGGREGATE OPERATIONS
    // ========================================================================

    /// Attach a pet. Only new pets are attached, and an identical unsaved
    /// pet already in the list is not attached twice.
    ///
    /// Returns true when the pet was attached.
    pub fn add_pet(&mut self, pet: Pet) -> bool {
        if !is_new(&pet) || self.pets.contains(&pet) {
            return false;
        }
        self.attach_loaded(pet);
        true
    }

    /// Attach a pet read back from the store, keeping name order
    pub(crate) fn attach_loaded(&mut self, pet: Pet) {
        let pos = self.pets.partition_point(|p| p.name <= pet.name);
        self.pets.insert(pos, pet);
    }

    /// Case-insensitive lookup by name; the first match wins.
    ///
    /// With `ignore_new`, unsaved pets are skipped.
    pub fn pet_by_name(&self, name: &str, ignore_new: bool) -> Option<&Pet> {
        let wanted = name.to_lowercase();
        self.pets
            .iter()
            .filter(|p| !ignore_new || !is_new(*p))
            .find(|p| p.name.to_lowercase() == wanted)
    }

    /// Lookup by key; unsaved pets never match
    pub fn pet_by_id(&self, id: EntityId) -> Option<&Pet> {
        self.pets.iter().find(|p| p.id == Some(id))
    }

    pub fn pet_by_id_mut(&mut self, id: EntityId) -> Option<&mut Pet> {
        self.pets.iter_mut().find(|p| p.id == Some(id))
    }

    /// Record a visit on one of this owner's pets
    pub fn add_visit(&mut self, pet_id: Option<EntityId>, visit: Option<Visit>) -> Result<()> {
        let pet_id = pet_id.ok_or_else(|| ClinicError::invalid_argument("Pet identifier must not be empty"))?;
        let visit = visit.ok_or_else(|| ClinicError::invalid_argument("Visit must not be empty"))?;

        let pet = self
            .pet_by_id_mut(pet_id)
            .ok_or_else(|| ClinicError::pet_not_found(pet_id))?;
        pet.add_visit(visit);
        Ok(())
    }

    /// Merge a submitted pet into the aggregate.
    ///
    /// A known key updates that pet in place (name, birth date, type) and
    /// keeps its visits. Anything else goes through `add_pet`.
    pub fn reconcile_pet(&mut self, incoming: Pet) -> Reconciled {
        if let Some(id) = incoming.id {
            if let Some(existing) = self.pet_by_id_mut(id) {
                existing.copy_details_from(incoming);
                self.sort_pets();
                return Reconciled::Updated;
            }
        }

        if self.add_pet(incoming) {
            Reconciled::Attached
        } else {
            Reconciled::Ignored
        }
    }

    /// Detach a pet (and its visits) before the next save
    pub fn remove_pet(&mut self, pet_id: EntityId) -> Option<Pet> {
        let pos = self.pets.iter().position(|p| p.id == Some(pet_id))?;
        Some(self.pets.remove(pos))
    }

    /// Copy the contact fields of `other`, keeping key and pets
    pub fn copy_contact_from(&mut self, other: Owner) {
        self.name = other.name;
        self.address = other.address;
        self.city = other.city;
        self.telephone = other.telephone;
    }

    fn sort_pets(&mut self) {
        self.pets.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

impl Identified for Owner {
    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

fn deserialize_pets<'de, D>(deserializer: D) -> std::result::Result<Vec<Pet>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut pets = Vec::<Pet>::deserialize(deserializer)?;
    pets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(pets)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::pet_type::PetType;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn george() -> Owner {
        let mut owner = Owner::new("George", "Franklin", "110 W. Liberty St.", "Madison", "6085551023");
        owner.id = Some(1);
        owner
    }

    fn saved_pet(id: EntityId, name: &str) -> Pet {
        Pet::new(name, Some(date(2020, 1, 1)), Some(PetType::with_id(1, "dog"))).with_id(id)
    }

    /// Saved pets can only come from the store; simulate one
    fn attach_saved(owner: &mut Owner, pet: Pet) {
        owner.attach_loaded(pet);
    }

    #[test]
    fn test_add_pet_only_attaches_new_pets() {
        let mut owner = george();

        assert!(!owner.add_pet(saved_pet(3, "Rex")));
        assert!(owner.pets().is_empty());

        assert!(owner.add_pet(Pet::new("Rex", None, None)));
        assert_eq!(owner.pets().len(), 1);
    }

    #[test]
    fn test_add_same_new_pet_twice_attaches_once() {
        let mut owner = george();
        let pet = Pet::new("Leo", Some(date(2020, 9, 7)), Some(PetType::with_id(1, "cat")));

        assert!(owner.add_pet(pet.clone()));
        assert!(!owner.add_pet(pet));
        assert_eq!(owner.pets().len(), 1);
    }

    #[test]
    fn test_pets_sorted_by_name_case_sensitive() {
        let mut owner = george();
        owner.add_pet(Pet::new("max", None, None));
        owner.add_pet(Pet::new("Bella", None, None));
        owner.add_pet(Pet::new("Zed", None, None));

        let names: Vec<&str> = owner.pets().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Bella", "Zed", "max"]);
    }

    #[test]
    fn test_pet_by_name_ignores_case() {
        let mut owner = george();
        attach_saved(&mut owner, saved_pet(7, "Rex"));

        assert_eq!(owner.pet_by_name("rEX", true).and_then(|p| p.id), Some(7));
        assert!(owner.pet_by_name("Max", false).is_none());
    }

    #[test]
    fn test_pet_by_name_ignore_new_skips_unsaved() {
        let mut owner = george();
        owner.add_pet(Pet::new("Rex", None, None));

        assert!(owner.pet_by_name("rex", true).is_none());
        assert!(owner.pet_by_name("rex", false).is_some());

        attach_saved(&mut owner, saved_pet(9, "REX"));
        let found = owner.pet_by_name("rex", true).unwrap();
        assert_eq!(found.id, Some(9));
    }

    #[test]
    fn test_pet_by_id_never_matches_new_pets() {
        let mut owner = george();
        owner.add_pet(Pet::new("Rex", None, None));
        attach_saved(&mut owner, saved_pet(4, "Max"));

        assert_eq!(owner.pet_by_id(4).map(|p| p.name.as_str()), Some("Max"));
        assert!(owner.pet_by_id(5).is_none());
    }

    #[test]
    fn test_add_visit_errors() {
        let mut owner = george();
        attach_saved(&mut owner, saved_pet(4, "Max"));
        let visit = Visit::new(date(2024, 1, 1), "checkup");

        let missing_id = owner.add_visit(None, Some(visit.clone())).unwrap_err();
        assert!(matches!(missing_id, ClinicError::InvalidArgument(_)));

        let unknown = owner.add_visit(Some(99), Some(visit.clone())).unwrap_err();
        assert!(unknown.is_invalid_reference());

        let missing_visit = owner.add_visit(Some(4), None).unwrap_err();
        assert!(matches!(missing_visit, ClinicError::InvalidArgument(_)));

        owner.add_visit(Some(4), Some(visit)).unwrap();
        assert_eq!(owner.pet_by_id(4).unwrap().visits().len(), 1);
    }

    #[test]
    fn test_reconcile_updates_in_place_and_keeps_visits() {
        let mut owner = george();
        let mut rex = saved_pet(7, "Rex");
        rex.add_visit(Visit::new(date(2024, 1, 15), "shots"));
        rex.add_visit(Visit::new(date(2024, 2, 10), "checkup"));
        attach_saved(&mut owner, rex);

        let edit = Pet::new("Rexie", Some(date(2019, 5, 5)), Some(PetType::with_id(2, "cat"))).with_id(7);
        assert_eq!(owner.reconcile_pet(edit), Reconciled::Updated);

        let pet = owner.pet_by_id(7).unwrap();
        assert_eq!(pet.name, "Rexie");
        assert_eq!(pet.birth_date, Some(date(2019, 5, 5)));
        assert_eq!(pet.type_name(), Some("cat"));
        let descriptions: Vec<&str> = pet.visits().iter().map(|v| v.description.as_str()).collect();
        assert_eq!(descriptions, vec!["shots", "checkup"]);
        assert_eq!(owner.pets().len(), 1);
    }

    #[test]
    fn test_reconcile_rename_resorts_pets() {
        let mut owner = george();
        attach_saved(&mut owner, saved_pet(1, "Alpha"));
        attach_saved(&mut owner, saved_pet(2, "Beta"));

        owner.reconcile_pet(Pet::new("Zulu", None, None).with_id(1));

        let names: Vec<&str> = owner.pets().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Beta", "Zulu"]);
    }

    #[test]
    fn test_reconcile_new_and_unknown() {
        let mut owner = george();

        assert_eq!(owner.reconcile_pet(Pet::new("Fresh", None, None)), Reconciled::Attached);
        assert_eq!(owner.reconcile_pet(saved_pet(404, "Ghost")), Reconciled::Ignored);
        assert_eq!(owner.pets().len(), 1);
    }

    #[test]
    fn test_remove_pet_and_copy_contact() {
        let mut owner = george();
        attach_saved(&mut owner, saved_pet(1, "Alpha"));

        let mut edit = Owner::new("Georgina", "Franklin", "1 Main St.", "Monona", "6085550000");
        edit.id = Some(1);
        owner.copy_contact_from(edit);

        assert_eq!(owner.first_name(), "Georgina");
        assert_eq!(owner.city, "Monona");
        assert_eq!(owner.pets().len(), 1);

        assert!(owner.remove_pet(1).is_some());
        assert!(owner.pets().is_empty());
    }

    #[test]
    fn test_owner_json_shape() {
        let json = r#"{"firstName": "Betty", "lastName": "Davis", "city": "Sun Prairie"}"#;
        let owner: Owner = serde_json::from_str(json).unwrap();
        assert_eq!(owner.first_name(), "Betty");
        assert_eq!(owner.last_name(), "Davis");
        assert!(owner.pets().is_empty());
        assert!(is_new(&owner));

        let json = r#"{"first_name": "ignored"}"#;
        let owner: Owner = serde_json::from_str(json).unwrap();
        assert_eq!(owner.first_name(), "");
    }

    #[test]
    fn test_json_keys_match_rejection_fields() {
        use crate::validation::fields;

        let mut owner = Owner::new("George", "Franklin", "110 W. Liberty St.", "Madison", "6085551023");
        owner.add_pet(Pet::new("Leo", Some(date(2020, 9, 7)), Some(PetType::new("cat"))));
        let value = serde_json::to_value(&owner).unwrap();

        for key in [fields::FIRST_NAME, fields::LAST_NAME, fields::ADDRESS, fields::CITY, fields::TELEPHONE] {
            assert!(value.get(key).is_some(), "owner JSON lacks {}", key);
        }
        let pet = &value["pets"][0];
        for key in [fields::NAME, fields::BIRTH_DATE, fields::TYPE] {
            assert!(pet.get(key).is_some(), "pet JSON lacks {}", key);
        }
        assert!(value.get("first_name").is_none());
    }
}
