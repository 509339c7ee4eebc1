//! Request handlers for the travel planner.
//!
//! Translates JSON request bodies plus an authenticated principal into core
//! service calls, and answers with status-coded JSON envelopes. Routing,
//! credentials and token issuance stay with the hosting web layer.

pub mod api;
mod payload;

pub use api::{ApiError, ApiResponse, Principal, TravelApi};
