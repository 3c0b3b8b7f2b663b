// 🩺 Clinic Service - Entry points for a controller or view layer
//
// Each operation is one unit of work on one owner aggregate:
// 1. load the aggregate (unknown id => InvalidReference)
// 2. validate the submitted payload (problems => FormOutcome::Rejected)
// 3. change the aggregate in memory
// 4. save it once
//
// Concurrent requests for the same owner must be serialized by the caller.

use crate::clock::{Clock, SystemClock};
use crate::entities::{EntityId, NewVisit, Owner, Pet, PetType, PetTypeRegistry, Reconciled};
use crate::error::{ClinicError, Result};
use crate::repository::OwnerRepository;
use crate::search::{self, SearchOutcome};
use crate::validation::{self, fields, RejectionCode, Rejections};
use chrono::NaiveDate;
use tracing::{info, warn};

/// Outcome of a form submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome<T> {
    /// Saved; carries the stored result
    Saved(T),
    /// Nothing saved; re-present the form with these rejections
    Rejected(Rejections),
}

impl<T> FormOutcome<T> {
    pub fn is_saved(&self) -> bool {
        matches!(self, FormOutcome::Saved(_))
    }

    pub fn saved(self) -> Option<T> {
        match self {
            FormOutcome::Saved(value) => Some(value),
            FormOutcome::Rejected(_) => None,
        }
    }

    pub fn rejections(&self) -> Option<&Rejections> {
        match self {
            FormOutcome::Saved(_) => None,
            FormOutcome::Rejected(rejections) => Some(rejections),
        }
    }
}

/// An import row that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based position in the input
    pub row: usize,
    pub name: String,
    pub rejections: Rejections,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
}

pub struct ClinicService<R, C = SystemClock> {
    repo: R,
    clock: C,
    page_size: usize,
}

impl<R: OwnerRepository> ClinicService<R, SystemClock> {
    pub fn new(repo: R) -> Self {
        ClinicService::with_clock(repo, SystemClock)
    }
}

impl<R: OwnerRepository, C: Clock> ClinicService<R, C> {
    pub fn with_clock(repo: R, clock: C) -> Self {
        ClinicService {
            repo,
            clock,
            page_size: search::PAGE_SIZE,
        }
    }

    /// Owners per search page; 0 keeps the current size
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        if page_size > 0 {
            self.page_size = page_size;
        }
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repo
    }

    pub fn into_repository(self) -> R {
        self.repo
    }

    // ========================================================================
    // OWNERS
    // ========================================================================

    /// Create an owner. Any key or pets in the payload are ignored.
    pub fn create_owner(&mut self, payload: Owner) -> Result<FormOutcome<Owner>> {
        let rejections = validation::validate_owner(&payload);
        if !rejections.is_empty() {
            warn!(rejections = rejections.len(), "owner creation rejected");
            return Ok(FormOutcome::Rejected(rejections));
        }

        let mut owner = Owner::default();
        owner.copy_contact_from(payload);
        let saved = self.repo.save_owner(owner)?;

        info!(owner_id = ?saved.id, name = %saved.name, "created owner");
        Ok(FormOutcome::Saved(saved))
    }

    /// Update an owner's contact details; its pets are untouched.
    /// The payload key must match `owner_id`.
    pub fn update_owner(&mut self, owner_id: EntityId, payload: Owner) -> Result<FormOutcome<Owner>> {
        let rejections = validation::validate_owner(&payload);
        if !rejections.is_empty() {
            warn!(owner_id, rejections = rejections.len(), "owner update rejected");
            return Ok(FormOutcome::Rejected(rejections));
        }

        if payload.id != Some(owner_id) {
            warn!(owner_id, payload_id = ?payload.id, "owner id mismatch");
            return Ok(FormOutcome::Rejected(Rejections::single(
                fields::ID,
                RejectionCode::Mismatch,
                "The owner ID in the form does not match the URL.",
            )));
        }

        let mut owner = self.load_owner(owner_id)?;
        owner.copy_contact_from(payload);
        let saved = self.repo.save_owner(owner)?;

        info!(owner_id, "updated owner");
        Ok(FormOutcome::Saved(saved))
    }

    /// Create every valid owner; rejected rows are skipped and reported
    pub fn import_owners(&mut self, owners: Vec<Owner>) -> Result<ImportReport> {
        let mut report = ImportReport::default();

        for (index, owner) in owners.into_iter().enumerate() {
            let name = owner.name.full_name();
            match self.create_owner(owner)? {
                FormOutcome::Saved(_) => report.imported += 1,
                FormOutcome::Rejected(rejections) => {
                    warn!(row = index + 1, %name, "import row skipped");
                    report.skipped.push(SkippedRow {
                        row: index + 1,
                        name,
                        rejections,
                    });
                }
            }
        }

        info!(imported = report.imported, skipped = report.skipped.len(), "owner import finished");
        Ok(report)
    }

    /// Owner with pets and visits
    pub fn show_owner(&self, owner_id: EntityId) -> Result<Owner> {
        self.load_owner(owner_id)
    }

    pub fn delete_owner(&mut self, owner_id: EntityId) -> Result<()> {
        self.repo.delete_owner(owner_id)?;
        info!(owner_id, "deleted owner and its pets");
        Ok(())
    }

    /// Last-name prefix search, 1-based page
    pub fn find_owners(&self, page: usize, last_name: Option<&str>) -> Result<SearchOutcome> {
        search::find_owners_paged(&self.repo, page, last_name, self.page_size)
    }

    // ========================================================================
    // PETS
    // ========================================================================

    /// Add a new pet to an owner. A key in the payload is ignored.
    pub fn create_pet(&mut self, owner_id: EntityId, mut pet: Pet) -> Result<FormOutcome<Owner>> {
        let mut owner = self.load_owner(owner_id)?;
        pet.id = None;

        let rejections = validation::validate_pet(&owner, &pet, self.clock.today());
        if !rejections.is_empty() {
            warn!(owner_id, rejections = rejections.len(), "pet creation rejected");
            return Ok(FormOutcome::Rejected(rejections));
        }

        let name = pet.name.clone();
        if owner.reconcile_pet(pet) != Reconciled::Attached {
            return Err(ClinicError::invalid_argument("Pet could not be attached"));
        }
        let saved = self.repo.save_owner(owner)?;

        info!(owner_id, pet = %name, "added pet");
        Ok(FormOutcome::Saved(saved))
    }

    /// Edit an existing pet in place; its visits are kept
    pub fn update_pet(&mut self, owner_id: EntityId, pet_id: EntityId, mut pet: Pet) -> Result<FormOutcome<Owner>> {
        let mut owner = self.load_owner(owner_id)?;
        if owner.pet_by_id(pet_id).is_none() {
            return Err(ClinicError::pet_not_found(pet_id));
        }
        pet.id = Some(pet_id);

        let rejections = validation::validate_pet(&owner, &pet, self.clock.today());
        if !rejections.is_empty() {
            warn!(owner_id, pet_id, rejections = rejections.len(), "pet update rejected");
            return Ok(FormOutcome::Rejected(rejections));
        }

        owner.reconcile_pet(pet);
        let saved = self.repo.save_owner(owner)?;

        info!(owner_id, pet_id, "updated pet");
        Ok(FormOutcome::Saved(saved))
    }

    // ========================================================================
    // VISITS
    // ========================================================================

    /// Record a visit; a missing date means today
    pub fn create_visit(&mut self, owner_id: EntityId, pet_id: EntityId, form: NewVisit) -> Result<FormOutcome<Owner>> {
        let mut owner = self.load_owner(owner_id)?;
        if owner.pet_by_id(pet_id).is_none() {
            return Err(ClinicError::pet_not_found(pet_id));
        }

        let visit = form.into_visit(self.clock.today());
        let rejections = validation::validate_visit(&visit);
        if !rejections.is_empty() {
            warn!(owner_id, pet_id, "visit rejected");
            return Ok(FormOutcome::Rejected(rejections));
        }

        let date = visit.date;
        owner.add_visit(Some(pet_id), Some(visit))?;
        let saved = self.repo.save_owner(owner)?;

        info!(owner_id, pet_id, %date, "recorded visit");
        Ok(FormOutcome::Saved(saved))
    }

    // ========================================================================
    // PET TYPES
    // ========================================================================

    pub fn list_pet_types(&self) -> Result<Vec<PetType>> {
        self.repo.list_pet_types()
    }

    pub fn pet_type_registry(&self) -> Result<PetTypeRegistry> {
        Ok(PetTypeRegistry::new(self.repo.list_pet_types()?))
    }

    /// Form text -> pet type, None when no stored type has that name
    pub fn resolve_pet_type(&self, name: &str) -> Result<Option<PetType>> {
        Ok(self.pet_type_registry()?.resolve(name).cloned())
    }

    /// Build a pet from form input. Type text that names no stored type
    /// is rejected on the `type` field; empty text leaves the type unset.
    pub fn pet_from_form(
        &self,
        name: &str,
        birth_date: Option<NaiveDate>,
        type_name: Option<&str>,
    ) -> Result<std::result::Result<Pet, Rejections>> {
        let pet_type = match type_name.filter(|t| !t.trim().is_empty()) {
            None => None,
            Some(text) => match self.resolve_pet_type(text)? {
                Some(pet_type) => Some(pet_type),
                None => {
                    return Ok(Err(Rejections::single(
                        fields::TYPE,
                        RejectionCode::UnknownType,
                        "type not found",
                    )))
                }
            },
        };
        Ok(Ok(Pet::new(name, birth_date, pet_type)))
    }

    /// Form text -> pet type, storing a new type when none matches
    pub fn resolve_or_create_pet_type(&mut self, name: &str) -> Result<PetType> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClinicError::invalid_argument("Pet type name must not be empty"));
        }

        let candidate = self.pet_type_registry()?.resolve_or_new(name);
        if candidate.id.is_some() {
            return Ok(candidate);
        }

        let stored = self.repo.save_pet_type(candidate)?;
        info!(pet_type = %stored.name, "created pet type");
        Ok(stored)
    }

    fn load_owner(&self, owner_id: EntityId) -> Result<Owner> {
        self.repo
            .load_owner_by_id(owner_id)?
            .ok_or_else(|| ClinicError::owner_not_found(owner_id))
    }
}

// ============================================================================
// TESTS
// ============================================================================
