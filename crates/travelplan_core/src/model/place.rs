//! Catalog place model.
//!
//! Places are identified by the external catalog's integer id and are shared
//! by every project that references them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Catalog-assigned place identifier.
pub type PlaceId = i64;

pub const MAX_PLACE_TITLE_CHARS: usize = 255;

/// Point of interest ingested from the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,
    pub title: String,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceValidationError {
    #[error("place id must be positive, got {0}")]
    InvalidId(PlaceId),
    #[error("place title must not be blank")]
    BlankTitle,
    #[error("place title must be at most {max} characters")]
    TitleTooLong { max: usize },
}

/// Validates a catalog id.
pub fn validate_place_id(id: PlaceId) -> Result<(), PlaceValidationError> {
    if id <= 0 {
        return Err(PlaceValidationError::InvalidId(id));
    }
    Ok(())
}

/// Trims a catalog title and enforces the stored length limit.
pub fn normalize_place_title(title: &str) -> Result<String, PlaceValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(PlaceValidationError::BlankTitle);
    }
    if trimmed.chars().count() > MAX_PLACE_TITLE_CHARS {
        return Err(PlaceValidationError::TitleTooLong {
            max: MAX_PLACE_TITLE_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_place_title, validate_place_id, PlaceValidationError};

    #[test]
    fn title_is_trimmed() {
        assert_eq!(normalize_place_title("  Nighthawks ").unwrap(), "Nighthawks");
    }

    #[test]
    fn blank_and_oversized_titles_are_rejected() {
        assert_eq!(
            normalize_place_title("   ").unwrap_err(),
            PlaceValidationError::BlankTitle
        );
        let long = "x".repeat(256);
        assert!(matches!(
            normalize_place_title(&long).unwrap_err(),
            PlaceValidationError::TitleTooLong { max: 255 }
        ));
    }

    #[test]
    fn non_positive_ids_are_rejected() {
        assert!(validate_place_id(0).is_err());
        assert!(validate_place_id(-4).is_err());
        assert!(validate_place_id(27992).is_ok());
    }
}
