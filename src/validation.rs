// 📐 Validation Rules - Field-scoped rejections
//
// Validators never fail fast: one pass collects every problem as a
// (field, code) rejection so the caller can re-present the whole form.
// Nothing is saved while any rejection is pending.

use crate::entities::{is_new, Owner, Pet, Visit};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// REJECTION CODES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionCode {
    /// Missing or blank value
    Required,
    /// Pet name already used by a sibling pet
    Duplicate,
    /// Birth date after today
    FutureBirthDate,
    /// Pet type text that names no stored type
    UnknownType,
    /// Telephone is not exactly ten digits
    InvalidTelephone,
    /// Search matched nothing
    NotFound,
    /// Payload key disagrees with the request path
    Mismatch,
}

impl RejectionCode {
    /// Message-bundle style code
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionCode::Required => "required",
            RejectionCode::Duplicate => "duplicate",
            RejectionCode::FutureBirthDate => "typeMismatch.birthDate",
            RejectionCode::UnknownType => "typeMismatch.type",
            RejectionCode::InvalidTelephone => "telephone.invalid",
            RejectionCode::NotFound => "notFound",
            RejectionCode::Mismatch => "mismatch",
        }
    }
}

// ============================================================================
// FIELD REJECTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRejection {
    pub field: String,
    pub code: RejectionCode,
    pub message: String,
}

impl FieldRejection {
    pub fn new(field: &str, code: RejectionCode, message: &str) -> Self {
        FieldRejection {
            field: field.to_string(),
            code,
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for FieldRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.field, self.code.as_str(), self.message)
    }
}

/// Every rejection raised by one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rejections(Vec<FieldRejection>);

impl Rejections {
    pub fn new() -> Self {
        Rejections(Vec::new())
    }

    /// A single rejection
    pub fn single(field: &str, code: RejectionCode, message: &str) -> Self {
        let mut rejections = Rejections::new();
        rejections.reject(field, code, message);
        rejections
    }

    pub fn reject(&mut self, field: &str, code: RejectionCode, message: &str) {
        self.0.push(FieldRejection::new(field, code, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldRejection> {
        self.0.iter()
    }

    pub fn has(&self, field: &str, code: RejectionCode) -> bool {
        self.0.iter().any(|r| r.field == field && r.code == code)
    }
}

impl std::fmt::Display for Rejections {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|r| r.to_string()).collect();
        f.write_str(&parts.join("; "))
    }
}

// ============================================================================
// FIELD NAMES
// ============================================================================

pub mod fields {
    pub const ID: &str = "id";
    pub const FIRST_NAME: &str = "firstName";
    pub const LAST_NAME: &str = "lastName";
    pub const ADDRESS: &str = "address";
    pub const CITY: &str = "city";
    pub const TELEPHONE: &str = "telephone";
    pub const NAME: &str = "name";
    pub const BIRTH_DATE: &str = "birthDate";
    pub const TYPE: &str = "type";
    pub const DESCRIPTION: &str = "description";
}

const REQUIRED_MESSAGE: &str = "is required";

static TELEPHONE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{10}$").expect("valid telephone pattern"));

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn require(rejections: &mut Rejections, field: &str, value: &str) {
    if is_blank(value) {
        rejections.reject(field, RejectionCode::Required, REQUIRED_MESSAGE);
    }
}

// ============================================================================
// OWNER RULES
// ============================================================================

/// Contact fields are required; telephone must be ten digits
pub fn validate_owner(owner: &Owner) -> Rejections {
    let mut rejections = Rejections::new();

    require(&mut rejections, fields::FIRST_NAME, owner.first_name());
    require(&mut rejections, fields::LAST_NAME, owner.last_name());
    require(&mut rejections, fields::ADDRESS, &owner.address);
    require(&mut rejections, fields::CITY, &owner.city);

    if is_blank(&owner.telephone) {
        rejections.reject(fields::TELEPHONE, RejectionCode::Required, REQUIRED_MESSAGE);
    } else if !TELEPHONE_PATTERN.is_match(&owner.telephone) {
        rejections.reject(
            fields::TELEPHONE,
            RejectionCode::InvalidTelephone,
            "Telephone must be a 10-digit number",
        );
    }

    rejections
}

// ============================================================================
// PET RULES
// ============================================================================

/// Check a submitted pet against its owner as currently stored.
///
/// - new pet: name must not match a saved sibling
/// - saved pet: name must not match any other sibling, saved or not
/// - new pet: name, type and birth date required; saved pet: name required
/// - birth date must not be after `today`
pub fn validate_pet(owner: &Owner, pet: &Pet, today: NaiveDate) -> Rejections {
    let mut rejections = Rejections::new();
    let name = pet.name.trim();

    if name.is_empty() {
        rejections.reject(fields::NAME, RejectionCode::Required, REQUIRED_MESSAGE);
    } else if is_new(pet) {
        if owner.pet_by_name(&pet.name, true).is_some() {
            rejections.reject(fields::NAME, RejectionCode::Duplicate, "already exists");
        }
    } else if let Some(other) = owner.pet_by_name(&pet.name, false) {
        if other.id != pet.id {
            rejections.reject(fields::NAME, RejectionCode::Duplicate, "already exists");
        }
    }

    if is_new(pet) {
        if pet.pet_type.is_none() {
            rejections.reject(fields::TYPE, RejectionCode::Required, REQUIRED_MESSAGE);
        }
        if pet.birth_date.is_none() {
            rejections.reject(fields::BIRTH_DATE, RejectionCode::Required, REQUIRED_MESSAGE);
        }
    }

    if let Some(birth_date) = pet.birth_date {
        if birth_date > today {
            rejections.reject(
                fields::BIRTH_DATE,
                RejectionCode::FutureBirthDate,
                "Birth date must not be in the future",
            );
        }
    }

    rejections
}

// ============================================================================
// VISIT RULES
// ============================================================================

pub fn validate_visit(visit: &Visit) -> Rejections {
    let mut rejections = Rejections::new();
    require(&mut rejections, fields::DESCRIPTION, &visit.description);
    rejections
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Owner, PetType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2024, 6, 1)
    }

    fn owner_with_saved_rex() -> Owner {
        // Round-trip through JSON so the pet carries a key like a loaded aggregate
        let json = r#"{
            "id": 1,
            "firstName": "George", "lastName": "Franklin",
            "address": "110 W. Liberty St.", "city": "Madison", "telephone": "6085551023",
            "pets": [{"id": 7, "name": "Rex", "birthDate": "2020-01-01", "type": {"id": 2, "name": "dog"}}]
        }"#;
        serde_json::from_str(json).unwrap()
    }

    fn new_pet(name: &str) -> Pet {
        Pet::new(name, Some(date(2023, 1, 1)), Some(PetType::with_id(2, "dog")))
    }

    #[test]
    fn test_valid_owner_passes() {
        let owner = Owner::new("George", "Franklin", "110 W. Liberty St.", "Madison", "6085551023");
        assert!(validate_owner(&owner).is_empty());
    }

    #[test]
    fn test_owner_required_fields_reported_together() {
        let owner = Owner::new(" ", "", "", "Madison", "");
        let rejections = validate_owner(&owner);

        assert_eq!(rejections.len(), 4);
        assert!(rejections.has(fields::FIRST_NAME, RejectionCode::Required));
        assert!(rejections.has(fields::LAST_NAME, RejectionCode::Required));
        assert!(rejections.has(fields::ADDRESS, RejectionCode::Required));
        assert!(rejections.has(fields::TELEPHONE, RejectionCode::Required));
    }

    #[test]
    fn test_owner_telephone_must_be_ten_digits() {
        for bad in ["608555102", "60855510234", "608-555-102", "60855510ab"] {
            let owner = Owner::new("George", "Franklin", "x", "Madison", bad);
            assert!(
                validate_owner(&owner).has(fields::TELEPHONE, RejectionCode::InvalidTelephone),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_new_pet_duplicate_of_saved_sibling_rejected() {
        let owner = owner_with_saved_rex();
        let rejections = validate_pet(&owner, &new_pet("rex"), today());

        assert!(rejections.has(fields::NAME, RejectionCode::Duplicate));
        assert_eq!(rejections.iter().next().map(|r| r.code.as_str()), Some("duplicate"));
    }

    #[test]
    fn test_new_pet_may_match_unsaved_sibling() {
        let mut owner = owner_with_saved_rex();
        owner.add_pet(new_pet("Max"));

        assert!(validate_pet(&owner, &new_pet("max"), today()).is_empty());
    }

    #[test]
    fn test_edit_may_keep_own_name() {
        let owner = owner_with_saved_rex();
        let edit = new_pet("Rex").with_id(7);

        assert!(validate_pet(&owner, &edit, today()).is_empty());
    }

    #[test]
    fn test_edit_may_not_take_sibling_name() {
        let mut owner = owner_with_saved_rex();
        owner.add_pet(new_pet("Max"));
        let edit = new_pet("MAX").with_id(7);

        assert!(validate_pet(&owner, &edit, today()).has(fields::NAME, RejectionCode::Duplicate));
    }

    #[test]
    fn test_new_pet_requires_name_type_and_birth_date() {
        let owner = owner_with_saved_rex();
        let rejections = validate_pet(&owner, &Pet::new("  ", None, None), today());

        assert!(rejections.has(fields::NAME, RejectionCode::Required));
        assert!(rejections.has(fields::TYPE, RejectionCode::Required));
        assert!(rejections.has(fields::BIRTH_DATE, RejectionCode::Required));
    }

    #[test]
    fn test_existing_pet_only_requires_name() {
        let owner = owner_with_saved_rex();
        let edit = Pet::new("Rex", None, None).with_id(7);

        assert!(validate_pet(&owner, &edit, today()).is_empty());
    }

    #[test]
    fn test_birth_date_boundary() {
        let owner = owner_with_saved_rex();

        let born_today = Pet::new("Tiny", Some(today()), Some(PetType::with_id(1, "cat")));
        assert!(validate_pet(&owner, &born_today, today()).is_empty());

        let tomorrow = today().succ_opt().unwrap();
        let born_tomorrow = Pet::new("Tiny", Some(tomorrow), Some(PetType::with_id(1, "cat")));
        assert!(validate_pet(&owner, &born_tomorrow, today()).has(fields::BIRTH_DATE, RejectionCode::FutureBirthDate));

        let edit = Pet::new("Rex", Some(tomorrow), None).with_id(7);
        assert!(validate_pet(&owner, &edit, today()).has(fields::BIRTH_DATE, RejectionCode::FutureBirthDate));
    }

    #[test]
    fn test_visit_requires_description() {
        assert!(validate_visit(&Visit::new(today(), "checkup")).is_empty());
        assert!(validate_visit(&Visit::new(today(), "   ")).has(fields::DESCRIPTION, RejectionCode::Required));
    }

    #[test]
    fn test_rejections_display() {
        let rejections = Rejections::single(fields::LAST_NAME, RejectionCode::NotFound, "not found");
        assert_eq!(rejections.to_string(), "lastName [notFound]: not found");
    }
}
