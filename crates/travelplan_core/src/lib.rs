//! Core domain logic for the travel planner.
//! This crate is the single source of truth for project/place invariants.

pub mod config;
pub mod db;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use ingest::{
    first_page_url, ingest_catalog, CatalogItem, CatalogPage, CatalogPagination, CatalogSource,
    IngestError, IngestFailure, IngestReport,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::place::{Place, PlaceId, PlaceValidationError};
pub use model::project::{
    NewTravelProject, ProjectDetail, ProjectId, ProjectPatch, ProjectPlaceId, ProjectPlacePatch,
    ProjectValidationError, TravelProject, TravelProjectPlace, MAX_PLACES_PER_PROJECT,
};
pub use model::user::{NewUser, User, UserId, UserValidationError};
pub use repo::place_repo::{PlaceRepository, SqlitePlaceRepository};
pub use repo::project_repo::{ProjectRepository, SqliteProjectRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{Conflict, PageQuery, RepoError, RepoResult};
pub use service::place_service::{PlaceListResult, PlaceService, PlaceServiceError};
pub use service::project_service::{
    recompute_completion, ProjectListResult, ProjectService, ProjectServiceError,
};
pub use service::user_service::{UserService, UserServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
