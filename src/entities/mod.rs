// Entity Models
// "An owner is the unit of consistency"
//
// Each record has:
// - Optional surrogate key (None = new, Some = persisted)
// - Plain values, no back-pointers
// - Owner -> Pets -> Visits held by value inside one aggregate

pub mod identity;
pub mod owner;
pub mod pet;
pub mod pet_type;
pub mod visit;

pub use identity::{is_new, EntityId, Identified, PersonName};
pub use owner::{Owner, Reconciled};
pub use pet::Pet;
pub use pet_type::{PetType, PetTypeRegistry, DEFAULT_PET_TYPES};
pub use visit::{NewVisit, Visit};
