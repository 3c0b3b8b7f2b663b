// Pet Clinic - Core Library
// Owners, their pets and the pets' visits, exposed for the CLI, the API server and tests

pub mod clock;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod logging;
pub mod repository;
pub mod search;
pub mod service;
pub mod validation;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use db::{load_owners_csv, seed_pet_types, setup_database, OwnerRecord, SqliteRepository};
pub use entities::{
    is_new, EntityId, Identified, NewVisit, Owner, PersonName, Pet, PetType, PetTypeRegistry, Reconciled, Visit,
    DEFAULT_PET_TYPES,
};
pub use error::{ClinicError, Result};
pub use repository::{MemoryRepository, OwnerPage, OwnerRepository};
pub use search::{find_owners, OwnerPageView, SearchOutcome, PAGE_SIZE};
pub use service::{ClinicService, FormOutcome, ImportReport, SkippedRow};
pub use validation::{fields, FieldRejection, RejectionCode, Rejections};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
