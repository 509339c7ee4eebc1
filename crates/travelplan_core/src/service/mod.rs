//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep request handlers decoupled from storage details.

pub mod place_service;
pub mod project_service;
pub mod user_service;
