// 📅 Visit Entity - A dated, described occurrence in a pet's history
//
// The date is always explicit. A submitted visit without a date takes
// "today" from the caller's Clock, never from the system clock here.

use crate::entities::identity::{EntityId, Identified};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Visit Entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    /// Surrogate key (None until saved)
    #[serde(default)]
    pub id: Option<EntityId>,

    /// Calendar date of the visit
    pub date: NaiveDate,

    /// What happened (required, non-blank)
    pub description: String,
}

impl Visit {
    /// Create an unsaved visit on the given date
    pub fn new(date: NaiveDate, description: impl Into<String>) -> Self {
        Visit {
            id: None,
            date,
            description: description.into(),
        }
    }
}

impl Identified for Visit {
    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

// ============================================================================
// VISIT FORM
// ============================================================================

/// Submitted visit payload; the date is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVisit {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
}

impl NewVisit {
    pub fn new(date: Option<NaiveDate>, description: impl Into<String>) -> Self {
        NewVisit {
            date,
            description: description.into(),
        }
    }

    /// Resolve the missing date against `today`
    pub fn into_visit(self, today: NaiveDate) -> Visit {
        Visit::new(self.date.unwrap_or(today), self.description)
    }
}

// ============================================================================
// TESTS
// ============================================================================
