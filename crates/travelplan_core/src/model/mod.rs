//! Domain model for users, catalog places and travel projects.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own field-level validation that does not need storage access.
//!
//! # Invariants
//! - `TravelProject::completed` is derived; no input type carries it.
//! - A project holds at most [`project::MAX_PLACES_PER_PROJECT`] places.

pub mod place;
pub mod project;
pub mod user;
