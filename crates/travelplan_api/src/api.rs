//! Use-case request handlers.
//!
//! # Responsibility
//! - Expose one handler per travel planner use-case.
//! - Map core errors onto HTTP-style status codes with a `detail` message.
//!
//! # Invariants
//! - Handlers never panic and never return `Err`; every outcome is an
//!   [`ApiResponse`].
//! - Storage failures answer `500` without leaking internals to the caller.
//! - Every handler except registration requires a known principal.

use crate::payload::{
    parse_body, AddPlacePayload, CreateProjectPayload, RegisterUserPayload,
    UpdateProjectPayload, UpdateProjectPlacePayload,
};
use log::{debug, error, warn};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;
use thiserror::Error;
use travelplan_core::db::{open_db, open_db_in_memory, DbError};
use travelplan_core::{
    AppConfig, PageQuery, PlaceId, PlaceService, PlaceServiceError, ProjectService,
    ProjectServiceError, RepoError, SqlitePlaceRepository, SqliteProjectRepository,
    SqliteUserRepository, UserId, UserService, UserServiceError,
};
use uuid::Uuid;

const INTERNAL_ERROR_DETAIL: &str = "internal storage error";

/// Authenticated caller attached by the hosting auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
}

/// Status-coded JSON response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// `Value::Null` for `204`.
    pub body: Value,
}

impl ApiResponse {
    fn ok(value: &impl Serialize) -> Result<Self, ApiError> {
        Self::with_status(200, value)
    }

    fn created(value: &impl Serialize) -> Result<Self, ApiError> {
        Self::with_status(201, value)
    }

    fn no_content() -> Self {
        Self {
            status: 204,
            body: Value::Null,
        }
    }

    fn with_status(status: u16, value: &impl Serialize) -> Result<Self, ApiError> {
        let body = serde_json::to_value(value)
            .map_err(|err| ApiError::Internal(format!("response encoding failed: {err}")))?;
        Ok(Self { status, body })
    }

    /// Returns the `detail` message of an error response.
    pub fn detail(&self) -> Option<&str> {
        self.body.get("detail").and_then(Value::as_str)
    }
}

/// Handler failure classes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("authentication credentials were not provided or are invalid")]
    Unauthorized,
    #[error("You do not have permission to perform this action.")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    /// Message is logged, never returned to the caller.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound(_) => 404,
            Self::Internal(_) => 500,
        }
    }

    fn into_response(self) -> ApiResponse {
        let detail = match &self {
            Self::Internal(_) => INTERNAL_ERROR_DETAIL.to_string(),
            other => other.to_string(),
        };
        ApiResponse {
            status: self.status(),
            body: json!({ "detail": detail }),
        }
    }
}

impl From<ProjectServiceError> for ApiError {
    fn from(value: ProjectServiceError) -> Self {
        match value {
            ProjectServiceError::Validation(err) => Self::BadRequest(err.to_string()),
            ProjectServiceError::Forbidden { .. } => Self::Forbidden,
            ProjectServiceError::ProjectNotFound(_)
            | ProjectServiceError::PlaceNotFound(_)
            | ProjectServiceError::ProjectPlaceNotFound(_) => Self::NotFound(value.to_string()),
            ProjectServiceError::Repo(err) => Self::Internal(err.to_string()),
        }
    }
}

impl From<PlaceServiceError> for ApiError {
    fn from(value: PlaceServiceError) -> Self {
        match value {
            PlaceServiceError::Validation(err) => Self::BadRequest(err.to_string()),
            PlaceServiceError::PlaceNotFound(_) => Self::NotFound(value.to_string()),
            PlaceServiceError::Repo(err) => Self::Internal(err.to_string()),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(value: UserServiceError) -> Self {
        match value {
            UserServiceError::Validation(_) | UserServiceError::EmailTaken(_) => {
                Self::BadRequest(value.to_string())
            }
            UserServiceError::UserNotFound(_) => Self::NotFound(value.to_string()),
            UserServiceError::Repo(err) => Self::Internal(err.to_string()),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        Self::Internal(value.to_string())
    }
}

/// Request handler facade bound to one migrated connection.
pub struct TravelApi {
    conn: Connection,
}

impl TravelApi {
    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    /// Opens the database configured by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, DbError> {
        Self::open(&config.db_path)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Underlying connection, for hosts that seed or inspect data directly.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// `POST /user/register/`
    pub fn register_user(&self, body: &str) -> ApiResponse {
        respond("user_register", || {
            let payload: RegisterUserPayload = parse_body(body)?;
            let user = self.users()?.register(&payload.into_input())?;
            ApiResponse::created(&user)
        })
    }

    /// `GET /user/profile/`
    pub fn profile(&self, principal: &Principal) -> ApiResponse {
        respond("user_profile", || {
            let user = self.authenticate(principal)?;
            ApiResponse::ok(&user)
        })
    }

    /// `GET /place/`
    pub fn list_places(
        &self,
        principal: &Principal,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> ApiResponse {
        respond("place_list", || {
            self.authenticate(principal)?;
            let page = self.places()?.list_places(&page_query(limit, offset))?;
            ApiResponse::ok(&json!({
                "items": page.items,
                "applied_limit": page.applied_limit,
                "total": page.total,
            }))
        })
    }

    /// `GET /place/{id}/`
    pub fn get_place(&self, principal: &Principal, place_id: PlaceId) -> ApiResponse {
        respond("place_get", || {
            self.authenticate(principal)?;
            let place = self.places()?.get_place(place_id)?;
            ApiResponse::ok(&place)
        })
    }

    /// `GET /travel_project/`
    pub fn list_projects(
        &self,
        principal: &Principal,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> ApiResponse {
        respond("project_list", || {
            self.authenticate(principal)?;
            let page = self
                .projects()?
                .list_projects(principal.user_id, &page_query(limit, offset))?;
            ApiResponse::ok(&json!({
                "items": page.items,
                "applied_limit": page.applied_limit,
            }))
        })
    }

    /// `POST /travel_project/`
    pub fn create_project(&self, principal: &Principal, body: &str) -> ApiResponse {
        respond("project_create", || {
            self.authenticate(principal)?;
            let input = parse_body::<CreateProjectPayload>(body)?.into_input()?;
            let detail = self.projects()?.create_project(principal.user_id, &input)?;
            ApiResponse::created(&detail)
        })
    }

    /// `GET /travel_project/{id}/`
    pub fn get_project(&self, principal: &Principal, project_id: &str) -> ApiResponse {
        respond("project_get", || {
            self.authenticate(principal)?;
            let project_id = path_id(project_id, "travel project")?;
            let detail = self.projects()?.get_project(principal.user_id, project_id)?;
            ApiResponse::ok(&detail)
        })
    }

    /// `PATCH /travel_project/{id}/`
    pub fn update_project(&self, principal: &Principal, project_id: &str, body: &str) -> ApiResponse {
        respond("project_update", || {
            self.authenticate(principal)?;
            let project_id = path_id(project_id, "travel project")?;
            let patch = parse_body::<UpdateProjectPayload>(body)?.into_patch()?;
            let detail = self
                .projects()?
                .update_project(principal.user_id, project_id, &patch)?;
            ApiResponse::ok(&detail)
        })
    }

    /// `DELETE /travel_project/{id}/`
    pub fn delete_project(&self, principal: &Principal, project_id: &str) -> ApiResponse {
        respond("project_delete", || {
            self.authenticate(principal)?;
            let project_id = path_id(project_id, "travel project")?;
            self.projects()?
                .delete_project(principal.user_id, project_id)?;
            Ok(ApiResponse::no_content())
        })
    }

    /// `POST /add_place/` with `{"project": <uuid>, "place": <id>}`.
    pub fn add_place(&self, principal: &Principal, body: &str) -> ApiResponse {
        respond("project_add_place", || {
            self.authenticate(principal)?;
            let payload: AddPlacePayload = parse_body(body)?;
            let association = self.projects()?.add_place(
                principal.user_id,
                payload.project,
                payload.place,
            )?;
            ApiResponse::created(&association)
        })
    }

    /// `GET /travel_project_place/{id}/`
    pub fn get_project_place(&self, principal: &Principal, association_id: &str) -> ApiResponse {
        respond("project_place_get", || {
            self.authenticate(principal)?;
            let association_id = path_id(association_id, "travel project place")?;
            let association = self
                .projects()?
                .get_project_place(principal.user_id, association_id)?;
            ApiResponse::ok(&association)
        })
    }

    /// `PATCH /travel_project_place/{id}/`
    pub fn update_project_place(
        &self,
        principal: &Principal,
        association_id: &str,
        body: &str,
    ) -> ApiResponse {
        respond("project_place_update", || {
            self.authenticate(principal)?;
            let association_id = path_id(association_id, "travel project place")?;
            let patch = parse_body::<UpdateProjectPlacePayload>(body)?.into_patch()?;
            let association = self.projects()?.update_project_place(
                principal.user_id,
                association_id,
                &patch,
            )?;
            ApiResponse::ok(&association)
        })
    }

    /// `DELETE /travel_project_place/{id}/`
    pub fn delete_project_place(&self, principal: &Principal, association_id: &str) -> ApiResponse {
        respond("project_place_delete", || {
            self.authenticate(principal)?;
            let association_id = path_id(association_id, "travel project place")?;
            self.projects()?
                .remove_project_place(principal.user_id, association_id)?;
            Ok(ApiResponse::no_content())
        })
    }

    fn authenticate(&self, principal: &Principal) -> Result<travelplan_core::User, ApiError> {
        match self.users()?.profile(principal.user_id) {
            Ok(user) => Ok(user),
            Err(UserServiceError::UserNotFound(_)) => Err(ApiError::Unauthorized),
            Err(err) => Err(err.into()),
        }
    }

    fn projects(&self) -> Result<ProjectService<SqliteProjectRepository<'_>>, ApiError> {
        Ok(ProjectService::new(SqliteProjectRepository::try_new(
            &self.conn,
        )?))
    }

    fn places(&self) -> Result<PlaceService<SqlitePlaceRepository<'_>>, ApiError> {
        Ok(PlaceService::new(SqlitePlaceRepository::try_new(&self.conn)?))
    }

    fn users(&self) -> Result<UserService<SqliteUserRepository<'_>>, ApiError> {
        Ok(UserService::new(SqliteUserRepository::try_new(&self.conn)?))
    }
}

fn respond(handler: &str, work: impl FnOnce() -> Result<ApiResponse, ApiError>) -> ApiResponse {
    match work() {
        Ok(response) => {
            debug!(
                "event=api_request module=api status=ok handler={handler} http_status={}",
                response.status
            );
            response
        }
        Err(ApiError::Internal(message)) => {
            error!(
                "event=api_request module=api status=error handler={handler} http_status=500 error={message}"
            );
            ApiError::Internal(message).into_response()
        }
        Err(err) => {
            warn!(
                "event=api_request module=api status=rejected handler={handler} http_status={}",
                err.status()
            );
            err.into_response()
        }
    }
}

fn page_query(limit: Option<u32>, offset: Option<u32>) -> PageQuery {
    PageQuery {
        limit,
        offset: offset.unwrap_or(0),
    }
}

/// Path ids that are not UUIDs cannot name any row.
fn path_id(raw: &str, entity: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::NotFound(format!("{entity} not found: {raw}")))
}
