//! Wire shapes of request bodies.
//!
//! # Invariants
//! - Unknown fields are rejected, so a typo never becomes a silent no-op.
//! - `null` is accepted only for nullable fields; a non-nullable field sent
//!   as `null` is a bad request.
//! - `completed` and an association's `project` are accepted by the parser
//!   only to be refused with a readable message.

use crate::api::ApiError;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use travelplan_core::{
    NewTravelProject, NewUser, PlaceId, ProjectId, ProjectPatch, ProjectPlacePatch,
};

/// Parses a JSON body, mapping syntax and shape errors to `400`.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let body = if body.trim().is_empty() { "{}" } else { body };
    serde_json::from_str(body)
        .map_err(|err| ApiError::BadRequest(format!("malformed request body: {err}")))
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn reject_completed(completed: &Option<Option<Value>>) -> Result<(), ApiError> {
    match completed {
        Some(_) => Err(ApiError::BadRequest(
            "completed is derived from visited places and can't be set".to_string(),
        )),
        None => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RegisterUserPayload {
    #[serde(default)]
    email: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

impl RegisterUserPayload {
    pub(crate) fn into_input(self) -> NewUser {
        NewUser {
            email: self.email,
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateProjectPayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    places: Vec<PlaceId>,
    #[serde(default, deserialize_with = "double_option")]
    completed: Option<Option<Value>>,
}

impl CreateProjectPayload {
    pub(crate) fn into_input(self) -> Result<NewTravelProject, ApiError> {
        reject_completed(&self.completed)?;
        Ok(NewTravelProject {
            name: self.name,
            description: self.description,
            start_date: self.start_date,
            place_ids: self.places,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct UpdateProjectPayload {
    #[serde(default, deserialize_with = "double_option")]
    name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    completed: Option<Option<Value>>,
}

impl UpdateProjectPayload {
    pub(crate) fn into_patch(self) -> Result<ProjectPatch, ApiError> {
        reject_completed(&self.completed)?;
        let name = match self.name {
            Some(None) => return Err(ApiError::BadRequest("name may not be null".to_string())),
            Some(Some(name)) => Some(name),
            None => None,
        };
        Ok(ProjectPatch {
            name,
            description: self.description,
            start_date: self.start_date,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AddPlacePayload {
    pub(crate) project: ProjectId,
    pub(crate) place: PlaceId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct UpdateProjectPlacePayload {
    #[serde(default, deserialize_with = "double_option")]
    notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    visited: Option<Option<bool>>,
    #[serde(default, deserialize_with = "double_option")]
    project: Option<Option<Value>>,
}

impl UpdateProjectPlacePayload {
    pub(crate) fn into_patch(self) -> Result<ProjectPlacePatch, ApiError> {
        if self.project.is_some() {
            return Err(ApiError::BadRequest(
                "project of a project place can't be changed".to_string(),
            ));
        }
        let visited = match self.visited {
            Some(None) => {
                return Err(ApiError::BadRequest("visited may not be null".to_string()))
            }
            Some(Some(visited)) => Some(visited),
            None => None,
        };
        Ok(ProjectPlacePatch {
            notes: self.notes,
            visited,
        })
    }
}
