//! Travel project and project-place association model.
//!
//! # Responsibility
//! - Define the project aggregate and its per-place visit records.
//! - Provide storage-independent checks used by the consistency engine.
//!
//! # Invariants
//! - `completed == places.iter().all(|p| p.visited)`, vacuously true when a
//!   project has no places.
//! - A project holds at most `MAX_PLACES_PER_PROJECT` associations.
//! - A (project, place) pair appears at most once.

use crate::model::place::PlaceId;
use crate::model::user::UserId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

pub type ProjectId = Uuid;
pub type ProjectPlaceId = Uuid;

/// Capacity cap for associations of one project.
pub const MAX_PLACES_PER_PROJECT: usize = 10;
pub const MAX_PROJECT_NAME_CHARS: usize = 50;

/// User-owned, named collection of places to visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelProject {
    pub id: ProjectId,
    pub owner_id: UserId,
    /// Globally unique display name.
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    /// Derived by the consistency engine; never written by callers.
    pub completed: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Visit record of one place inside one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelProjectPlace {
    pub id: ProjectPlaceId,
    pub project_id: ProjectId,
    pub place_id: PlaceId,
    pub notes: Option<String>,
    pub visited: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Project together with its associations in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: TravelProject,
    pub places: Vec<TravelProjectPlace>,
}

impl ProjectDetail {
    /// Returns whether the stored `completed` flag agrees with the places.
    pub fn completion_is_consistent(&self) -> bool {
        self.project.completed == all_visited(&self.places)
    }
}

/// Input for project creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTravelProject {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    /// Initial places, added unvisited.
    pub place_ids: Vec<PlaceId>,
}

/// Partial update of owner-editable project fields.
///
/// `Some(None)` clears an optional field; `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub start_date: Option<Option<NaiveDate>>,
}

/// Partial update of an association.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPlacePatch {
    pub notes: Option<Option<String>>,
    pub visited: Option<bool>,
}

impl ProjectPlacePatch {
    pub fn is_empty(&self) -> bool {
        self.notes.is_none() && self.visited.is_none()
    }
}

/// Rule violations reported back to callers as readable messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectValidationError {
    #[error("project name must not be blank")]
    BlankName,
    #[error("project name must be at most {max} characters")]
    NameTooLong { max: usize },
    #[error("a project named `{0}` already exists")]
    NameTaken(String),
    #[error("place list can't contain duplicates: {}", join_ids(.0))]
    DuplicatePlaceIds(Vec<PlaceId>),
    #[error("a project can contain at most {max} places, got {count}")]
    TooManyPlaces { count: usize, max: usize },
    #[error("unknown place ids: {}", join_ids(.0))]
    UnknownPlaces(Vec<PlaceId>),
    #[error("place {place_id} is already in the project")]
    AlreadyInProject {
        project_id: ProjectId,
        place_id: PlaceId,
    },
    #[error("a project can contain at most {max} places")]
    CapacityExceeded { max: usize },
    #[error("can't delete a project with {visited} visited place(s)")]
    DeletionBlocked { visited: usize },
}

/// Trims a project name and checks blank/length rules.
pub fn normalize_project_name(name: &str) -> Result<String, ProjectValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ProjectValidationError::BlankName);
    }
    if trimmed.chars().count() > MAX_PROJECT_NAME_CHARS {
        return Err(ProjectValidationError::NameTooLong {
            max: MAX_PROJECT_NAME_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

/// Checks the initial place list of a new project for size and duplicates.
///
/// Existence of the referenced places is checked by the engine against storage.
pub fn check_initial_place_ids(place_ids: &[PlaceId]) -> Result<(), ProjectValidationError> {
    if place_ids.len() > MAX_PLACES_PER_PROJECT {
        return Err(ProjectValidationError::TooManyPlaces {
            count: place_ids.len(),
            max: MAX_PLACES_PER_PROJECT,
        });
    }

    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for id in place_ids {
        if !seen.insert(*id) {
            duplicates.insert(*id);
        }
    }
    if !duplicates.is_empty() {
        return Err(ProjectValidationError::DuplicatePlaceIds(
            duplicates.into_iter().collect(),
        ));
    }
    Ok(())
}

/// Completion rule over a set of associations.
pub fn all_visited(places: &[TravelProjectPlace]) -> bool {
    places.iter().all(|place| place.visited)
}

fn join_ids(ids: &[PlaceId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::{
        all_visited, check_initial_place_ids, normalize_project_name, ProjectValidationError,
        TravelProjectPlace,
    };
    use uuid::Uuid;

    fn association(visited: bool) -> TravelProjectPlace {
        TravelProjectPlace {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            place_id: 1,
            notes: None,
            visited,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn empty_project_counts_as_completed() {
        assert!(all_visited(&[]));
        assert!(!all_visited(&[association(true), association(false)]));
        assert!(all_visited(&[association(true), association(true)]));
    }

    #[test]
    fn duplicate_ids_are_reported_once_each() {
        let err = check_initial_place_ids(&[5, 5, 7, 7, 7, 1]).unwrap_err();
        assert_eq!(err, ProjectValidationError::DuplicatePlaceIds(vec![5, 7]));
        assert_eq!(err.to_string(), "place list can't contain duplicates: 5, 7");
    }

    #[test]
    fn more_than_ten_places_is_rejected() {
        let ids: Vec<i64> = (1..=11).collect();
        assert_eq!(
            check_initial_place_ids(&ids).unwrap_err(),
            ProjectValidationError::TooManyPlaces { count: 11, max: 10 }
        );
        assert!(check_initial_place_ids(&ids[..10]).is_ok());
    }

    #[test]
    fn project_name_is_trimmed_and_bounded() {
        assert_eq!(normalize_project_name("  Lisbon  ").unwrap(), "Lisbon");
        assert_eq!(
            normalize_project_name(" ").unwrap_err(),
            ProjectValidationError::BlankName
        );
        assert!(normalize_project_name(&"n".repeat(51)).is_err());
    }
}
