// 🗄️ Owner Repository - Persistence contract for the owner aggregate
//
// The store only sees whole aggregates: save assigns keys to the owner
// and to every new pet and visit inside it, in one unit of work.

use crate::entities::{EntityId, Owner, PetType};
use crate::error::{ClinicError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// PAGE
// ============================================================================

/// One page of a prefix query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerPage {
    /// Owners on the requested page
    pub owners: Vec<Owner>,
    /// Matches across all pages
    pub total_count: usize,
    pub total_pages: usize,
}

impl OwnerPage {
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// ceil(total / page_size)
pub fn total_pages(total_count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        total_count.div_ceil(page_size)
    }
}

// ============================================================================
// REPOSITORY TRAIT
// ============================================================================

pub trait OwnerRepository {
    /// Full aggregate (pets and visits included)
    fn load_owner_by_id(&self, id: EntityId) -> Result<Option<Owner>>;

    /// Persist the aggregate; returns it with every key assigned.
    /// Pets or visits dropped from the aggregate are deleted.
    fn save_owner(&mut self, owner: Owner) -> Result<Owner>;

    /// Delete the owner with all its pets and visits
    fn delete_owner(&mut self, id: EntityId) -> Result<()>;

    /// Owners whose last name starts with `prefix` (case-sensitive),
    /// ordered by key, page index zero-based
    fn query_by_last_name_prefix(&self, prefix: &str, page_index: usize, page_size: usize) -> Result<OwnerPage>;

    /// All pet types, sorted by name
    fn list_pet_types(&self) -> Result<Vec<PetType>>;

    /// Persist a pet type; returns it with its key
    fn save_pet_type(&mut self, pet_type: PetType) -> Result<PetType>;
}

// ============================================================================
// IN-MEMORY REPOSITORY
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Sequences {
    owner: EntityId,
    pet: EntityId,
    visit: EntityId,
    pet_type: EntityId,
}

fn next(seq: &mut EntityId) -> EntityId {
    *seq += 1;
    *seq
}

/// Map-backed store, used by tests and as a scratch store
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    owners: BTreeMap<EntityId, Owner>,
    pet_types: Vec<PetType>,
    sequences: Sequences,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the default pet types
    pub fn with_default_pet_types() -> Self {
        let mut repo = Self::new();
        for name in crate::entities::DEFAULT_PET_TYPES {
            let id = next(&mut repo.sequences.pet_type);
            repo.pet_types.push(PetType::with_id(id, name));
        }
        repo
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    /// Keep a type reference pointing at a stored type; new types are stored first
    fn attach_pet_type(&mut self, pet_type: PetType) -> PetType {
        match pet_type.id {
            Some(_) => pet_type,
            None => match self.pet_types.iter().find(|t| t.name == pet_type.name) {
                Some(existing) => existing.clone(),
                None => {
                    let id = next(&mut self.sequences.pet_type);
                    let stored = PetType::with_id(id, pet_type.name);
                    self.pet_types.push(stored.clone());
                    stored
                }
            },
        }
    }
}

impl OwnerRepository for MemoryRepository {
    fn load_owner_by_id(&self, id: EntityId) -> Result<Option<Owner>> {
        Ok(self.owners.get(&id).cloned())
    }

    fn save_owner(&mut self, mut owner: Owner) -> Result<Owner> {
        let owner_id = match owner.id {
            Some(id) => {
                if !self.owners.contains_key(&id) {
                    return Err(ClinicError::owner_not_found(id));
                }
                id
            }
            None => next(&mut self.sequences.owner),
        };
        owner.id = Some(owner_id);

        for pet in owner.pets_mut() {
            if pet.id.is_none() {
                pet.id = Some(next(&mut self.sequences.pet));
            }
            if let Some(pet_type) = pet.pet_type.take() {
                pet.pet_type = Some(self.attach_pet_type(pet_type));
            }
            for visit in pet.visits_mut() {
                if visit.id.is_none() {
                    visit.id = Some(next(&mut self.sequences.visit));
                }
            }
        }

        self.owners.insert(owner_id, owner.clone());
        Ok(owner)
    }

    fn delete_owner(&mut self, id: EntityId) -> Result<()> {
        self.owners
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ClinicError::owner_not_found(id))
    }

    fn query_by_last_name_prefix(&self, prefix: &str, page_index: usize, page_size: usize) -> Result<OwnerPage> {
        if page_size == 0 {
            return Err(ClinicError::invalid_argument("Page size must be positive"));
        }

        let matches: Vec<&Owner> = self
            .owners
            .values()
            .filter(|o| o.last_name().starts_with(prefix))
            .collect();
        let total_count = matches.len();

        let owners = matches
            .into_iter()
            .skip(page_index.saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect();

        Ok(OwnerPage {
            owners,
            total_count,
            total_pages: total_pages(total_count, page_size),
        })
    }

    fn list_pet_types(&self) -> Result<Vec<PetType>> {
        let mut types = self.pet_types.clone();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    fn save_pet_type(&mut self, mut pet_type: PetType) -> Result<PetType> {
        match pet_type.id {
            Some(id) => match self.pet_types.iter_mut().find(|t| t.id == Some(id)) {
                Some(stored) => {
                    stored.name = pet_type.name.clone();
                    Ok(pet_type)
                }
                None => Err(ClinicError::InvalidReference { entity: "PetType", id }),
            },
            None => {
                pet_type.id = Some(next(&mut self.sequences.pet_type));
                self.pet_types.push(pet_type.clone());
                Ok(pet_type)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
