//! Place use-case service.
//!
//! # Responsibility
//! - Serve catalog listings to callers.
//! - Provide the get-or-create entry point used by catalog ingestion.
//!
//! # Invariants
//! - Re-ingesting an existing id never changes the stored title.

use crate::model::place::{normalize_place_title, validate_place_id, Place, PlaceId, PlaceValidationError};
use crate::repo::place_repo::PlaceRepository;
use crate::repo::{PageQuery, RepoError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaceServiceError {
    #[error(transparent)]
    Validation(#[from] PlaceValidationError),
    #[error("place not found: {0}")]
    PlaceNotFound(PlaceId),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Page of catalog places.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceListResult {
    pub items: Vec<Place>,
    pub applied_limit: u32,
    /// Total number of stored places.
    pub total: u64,
}

/// Place service facade over repository implementations.
pub struct PlaceService<R: PlaceRepository> {
    repo: R,
}

impl<R: PlaceRepository> PlaceService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Inserts a catalog place unless its id is already stored.
    ///
    /// Returns the stored place and whether this call created it.
    pub fn upsert_place(
        &self,
        id: PlaceId,
        title: &str,
    ) -> Result<(Place, bool), PlaceServiceError> {
        validate_place_id(id)?;
        let title = normalize_place_title(title)?;
        Ok(self.repo.get_or_create_place(id, &title)?)
    }

    pub fn get_place(&self, id: PlaceId) -> Result<Place, PlaceServiceError> {
        self.repo
            .get_place(id)?
            .ok_or(PlaceServiceError::PlaceNotFound(id))
    }

    /// Lists places newest first.
    pub fn list_places(&self, query: &PageQuery) -> Result<PlaceListResult, PlaceServiceError> {
        Ok(PlaceListResult {
            items: self.repo.list_places(query)?,
            applied_limit: query.applied_limit(),
            total: self.repo.count_places()?,
        })
    }
}
