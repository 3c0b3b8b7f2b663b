// 🔎 Owner Search - Paginated last-name prefix search
//
// Three outcomes:
// - nothing on the page        => NotFound (rejection on lastName)
// - exactly one match overall  => Single (skip the list, go to the owner)
// - otherwise                  => Page view
//
// "Exactly one" is judged on the total count, never on the page length.

use crate::entities::Owner;
use crate::error::Result;
use crate::repository::OwnerRepository;
use crate::validation::{fields, RejectionCode, Rejections};
use serde::Serialize;

/// Owners per page
pub const PAGE_SIZE: usize = 5;

/// Page view for a multi-owner result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerPageView {
    /// 1-based
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub owners: Vec<Owner>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    NotFound(Rejections),
    Single(Owner),
    Page(OwnerPageView),
}

impl SearchOutcome {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SearchOutcome::NotFound(_))
    }
}

/// Search with the fixed page size
pub fn find_owners<R: OwnerRepository + ?Sized>(repo: &R, page: usize, last_name: Option<&str>) -> Result<SearchOutcome> {
    find_owners_paged(repo, page, last_name, PAGE_SIZE)
}

/// Search with an explicit page size. `page` is 1-based; 0 is read as 1.
/// A missing or empty prefix matches every owner.
pub fn find_owners_paged<R: OwnerRepository + ?Sized>(
    repo: &R,
    page: usize,
    last_name: Option<&str>,
    page_size: usize,
) -> Result<SearchOutcome> {
    let page = page.max(1);
    let prefix = last_name.unwrap_or("");

    let mut results = repo.query_by_last_name_prefix(prefix, page - 1, page_size)?;

    if results.is_empty() {
        tracing::debug!(prefix, page, "owner search matched nothing");
        return Ok(SearchOutcome::NotFound(Rejections::single(
            fields::LAST_NAME,
            RejectionCode::NotFound,
            "not found",
        )));
    }

    if results.total_count == 1 {
        let owner = results.owners.swap_remove(0);
        tracing::debug!(prefix, owner_id = ?owner.id, "owner search matched a single owner");
        return Ok(SearchOutcome::Single(owner));
    }

    tracing::debug!(prefix, page, total = results.total_count, "owner search returned a page");
    Ok(SearchOutcome::Page(OwnerPageView {
        current_page: page,
        total_pages: results.total_pages,
        total_items: results.total_count,
        owners: results.owners,
    }))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EntityId, PetType};
    use crate::repository::{MemoryRepository, OwnerPage};

    fn owner(first: &str, last: &str) -> Owner {
        Owner::new(first, last, "1 Main St.", "Madison", "6085550000")
    }

    fn repo_with_smiths(count: usize) -> MemoryRepository {
        let mut repo = MemoryRepository::new();
        for i in 0..count {
            repo.save_owner(owner(&format!("Owner{}", i), "Smith")).unwrap();
        }
        repo.save_owner(owner("Betty", "Davis")).unwrap();
        repo
    }

    #[test]
    fn test_six_smiths_paginate() {
        let repo = repo_with_smiths(6);

        match find_owners(&repo, 1, Some("Smith")).unwrap() {
            SearchOutcome::Page(view) => {
                assert_eq!(view.current_page, 1);
                assert_eq!(view.owners.len(), 5);
                assert_eq!(view.total_pages, 2);
                assert_eq!(view.total_items, 6);
            }
            other => panic!("expected a page, got {:?}", other),
        }

        match find_owners(&repo, 2, Some("Smith")).unwrap() {
            SearchOutcome::Page(view) => {
                assert_eq!(view.current_page, 2);
                assert_eq!(view.owners.len(), 1);
            }
            other => panic!("expected a page, got {:?}", other),
        }
    }

    #[test]
    fn test_single_match_short_circuits() {
        let repo = repo_with_smiths(1);

        match find_owners(&repo, 1, Some("Sm")).unwrap() {
            SearchOutcome::Single(found) => assert_eq!(found.first_name(), "Owner0"),
            other => panic!("expected a single owner, got {:?}", other),
        }
    }

    #[test]
    fn test_no_match_rejects_last_name() {
        let repo = repo_with_smiths(2);

        match find_owners(&repo, 1, Some("Zz")).unwrap() {
            SearchOutcome::NotFound(rejections) => {
                assert!(rejections.has(fields::LAST_NAME, RejectionCode::NotFound));
            }
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_prefix_matches_everyone() {
        let repo = repo_with_smiths(3);

        match find_owners(&repo, 1, None).unwrap() {
            SearchOutcome::Page(view) => assert_eq!(view.total_items, 4),
            other => panic!("expected a page, got {:?}", other),
        }
    }

    #[test]
    fn test_page_zero_reads_as_first_page() {
        let repo = repo_with_smiths(3);

        match find_owners(&repo, 0, Some("Smith")).unwrap() {
            SearchOutcome::Page(view) => assert_eq!(view.current_page, 1),
            other => panic!("expected a page, got {:?}", other),
        }
    }

    #[test]
    fn test_page_past_the_end_is_not_found() {
        let repo = repo_with_smiths(6);
        assert!(find_owners(&repo, 3, Some("Smith")).unwrap().is_not_found());
    }

    /// Count says several, page holds one: still a page, never a single
    struct SkewedRepository;

    impl OwnerRepository for SkewedRepository {
        fn load_owner_by_id(&self, _id: EntityId) -> Result<Option<Owner>> {
            Ok(None)
        }

        fn save_owner(&mut self, owner: Owner) -> Result<Owner> {
            Ok(owner)
        }

        fn delete_owner(&mut self, _id: EntityId) -> Result<()> {
            Ok(())
        }

        fn query_by_last_name_prefix(&self, _prefix: &str, _page_index: usize, _page_size: usize) -> Result<OwnerPage> {
            Ok(OwnerPage {
                owners: vec![owner("Only", "Smith")],
                total_count: 6,
                total_pages: 2,
            })
        }

        fn list_pet_types(&self) -> Result<Vec<PetType>> {
            Ok(Vec::new())
        }

        fn save_pet_type(&mut self, pet_type: PetType) -> Result<PetType> {
            Ok(pet_type)
        }
    }

    #[test]
    fn test_single_is_judged_on_total_count() {
        match find_owners(&SkewedRepository, 2, Some("Smith")).unwrap() {
            SearchOutcome::Page(view) => {
                assert_eq!(view.owners.len(), 1);
                assert_eq!(view.total_items, 6);
            }
            other => panic!("expected a page, got {:?}", other),
        }
    }
}
