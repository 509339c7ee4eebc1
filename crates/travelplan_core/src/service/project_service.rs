//! Travel project consistency engine.
//!
//! # Responsibility
//! - Own every mutation of projects and their place associations.
//! - Enforce capacity, uniqueness, ownership and deletion-guard rules.
//! - Recompute the derived `completed` flag as an explicit step of each
//!   association mutation, inside the same transaction.
//!
//! # Invariants
//! - After every committed mutation, `project.completed` equals "no
//!   association of the project is unvisited".
//! - A project never holds more than `MAX_PLACES_PER_PROJECT` associations.
//! - A failed operation commits nothing.

use crate::model::place::PlaceId;
use crate::model::project::{
    check_initial_place_ids, normalize_project_name, NewTravelProject, ProjectDetail, ProjectId,
    ProjectPatch, ProjectPlaceId, ProjectPlacePatch, ProjectValidationError, TravelProject,
    TravelProjectPlace, MAX_PLACES_PER_PROJECT,
};
use crate::model::user::UserId;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::{Conflict, PageQuery, RepoError};
use log::{error, info, warn};
use thiserror::Error;

/// Errors from project use-cases.
#[derive(Debug, Error)]
pub enum ProjectServiceError {
    /// Business rule violation; safe to show to the caller.
    #[error(transparent)]
    Validation(#[from] ProjectValidationError),
    /// Caller does not own the target project.
    #[error("user {user_id} is not allowed to access project {project_id}")]
    Forbidden {
        user_id: UserId,
        project_id: ProjectId,
    },
    #[error("travel project not found: {0}")]
    ProjectNotFound(ProjectId),
    #[error("place not found: {0}")]
    PlaceNotFound(PlaceId),
    #[error("travel project place not found: {0}")]
    ProjectPlaceNotFound(ProjectPlaceId),
    /// Persistence-layer failure.
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for ProjectServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Conflict(Conflict::ProjectPlaceLimit) => {
                Self::Validation(ProjectValidationError::CapacityExceeded {
                    max: MAX_PLACES_PER_PROJECT,
                })
            }
            other => Self::Repo(other),
        }
    }
}

impl ProjectServiceError {
    fn reason_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Forbidden { .. } => "forbidden",
            Self::ProjectNotFound(_) | Self::PlaceNotFound(_) | Self::ProjectPlaceNotFound(_) => {
                "not_found"
            }
            Self::Repo(_) => "storage",
        }
    }
}

/// Page of one owner's projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectListResult {
    pub items: Vec<ProjectDetail>,
    /// Effective normalized limit used by the query.
    pub applied_limit: u32,
}

/// Consistency engine over a project repository.
pub struct ProjectService<R: ProjectRepository> {
    repo: R,
}

impl<R: ProjectRepository> ProjectService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a project and its initial unvisited places atomically.
    ///
    /// # Errors
    /// - `Validation` for a bad name, a taken name, duplicate ids, more than
    ///   ten ids, or ids with no stored place. Nothing is committed.
    pub fn create_project(
        &self,
        owner_id: UserId,
        input: &NewTravelProject,
    ) -> Result<ProjectDetail, ProjectServiceError> {
        let result = self.create_project_inner(owner_id, input);
        match &result {
            Ok(detail) => info!(
                "event=project_create module=project_service status=ok project_id={} places={} completed={}",
                detail.project.id,
                detail.places.len(),
                detail.project.completed
            ),
            Err(err) => log_failure("project_create", err),
        }
        result
    }

    fn create_project_inner(
        &self,
        owner_id: UserId,
        input: &NewTravelProject,
    ) -> Result<ProjectDetail, ProjectServiceError> {
        let name = normalize_project_name(&input.name)?;
        check_initial_place_ids(&input.place_ids)?;
        let description = normalize_optional_text(input.description.clone());

        self.repo.transaction(|repo| -> Result<ProjectDetail, ProjectServiceError> {
            let known = repo.existing_place_ids(&input.place_ids)?;
            let unknown: Vec<PlaceId> = input
                .place_ids
                .iter()
                .copied()
                .filter(|id| !known.contains(id))
                .collect();
            if !unknown.is_empty() {
                return Err(ProjectValidationError::UnknownPlaces(unknown).into());
            }

            let project = repo
                .insert_project(owner_id, &name, description.as_deref(), input.start_date)
                .map_err(|err| name_conflict(err, &name))?;
            for place_id in &input.place_ids {
                repo.insert_project_place(project.id, *place_id)?;
            }

            recompute_completion(repo, project.id)?;
            load_detail(repo, project.id)
        })
    }

    /// Adds one place to a project the caller owns.
    ///
    /// The new association starts unvisited, so a completed project becomes
    /// incomplete in the same commit.
    pub fn add_place(
        &self,
        caller: UserId,
        project_id: ProjectId,
        place_id: PlaceId,
    ) -> Result<TravelProjectPlace, ProjectServiceError> {
        let result = self.repo.transaction(|repo| -> Result<_, ProjectServiceError> {
            let project = owned_project(repo, caller, project_id)?;
            if repo.existing_place_ids(&[place_id])?.is_empty() {
                return Err(ProjectServiceError::PlaceNotFound(place_id));
            }
            if repo.project_place_exists(project.id, place_id)? {
                return Err(ProjectValidationError::AlreadyInProject {
                    project_id,
                    place_id,
                }
                .into());
            }
            if repo.count_project_places(project.id)? >= MAX_PLACES_PER_PROJECT {
                return Err(ProjectValidationError::CapacityExceeded {
                    max: MAX_PLACES_PER_PROJECT,
                }
                .into());
            }

            let association = repo
                .insert_project_place(project.id, place_id)
                .map_err(|err| pair_conflict(err, project_id, place_id))?;
            recompute_completion(repo, project.id)?;
            Ok(association)
        });

        match &result {
            Ok(association) => info!(
                "event=project_add_place module=project_service status=ok project_id={} place_id={} association_id={}",
                project_id, place_id, association.id
            ),
            Err(err) => log_failure("project_add_place", err),
        }
        result
    }

    /// Updates notes and/or the visited flag of one association.
    pub fn update_project_place(
        &self,
        caller: UserId,
        association_id: ProjectPlaceId,
        patch: &ProjectPlacePatch,
    ) -> Result<TravelProjectPlace, ProjectServiceError> {
        let patch = ProjectPlacePatch {
            notes: patch.notes.clone().map(normalize_optional_text),
            visited: patch.visited,
        };

        let result = self.repo.transaction(|repo| -> Result<_, ProjectServiceError> {
            let association = owned_association(repo, caller, association_id)?;
            if !patch.is_empty() {
                repo.update_project_place(association.id, &patch)?;
            }
            recompute_completion(repo, association.project_id)?;
            repo.get_project_place(association.id)?
                .ok_or(ProjectServiceError::ProjectPlaceNotFound(association.id))
        });

        match &result {
            Ok(association) => info!(
                "event=project_place_update module=project_service status=ok association_id={} visited={}",
                association.id, association.visited
            ),
            Err(err) => log_failure("project_place_update", err),
        }
        result
    }

    /// Removes one association and returns the owning project afterwards.
    pub fn remove_project_place(
        &self,
        caller: UserId,
        association_id: ProjectPlaceId,
    ) -> Result<TravelProject, ProjectServiceError> {
        let result = self.repo.transaction(|repo| -> Result<_, ProjectServiceError> {
            let association = owned_association(repo, caller, association_id)?;
            repo.delete_project_place(association.id)?;
            recompute_completion(repo, association.project_id)?;
            repo.get_project(association.project_id)?
                .ok_or(ProjectServiceError::ProjectNotFound(association.project_id))
        });

        match &result {
            Ok(project) => info!(
                "event=project_place_delete module=project_service status=ok association_id={} project_id={} completed={}",
                association_id, project.id, project.completed
            ),
            Err(err) => log_failure("project_place_delete", err),
        }
        result
    }

    /// Deletes a project with all of its associations.
    ///
    /// # Errors
    /// - `Validation(DeletionBlocked)` when any place was already visited.
    pub fn delete_project(
        &self,
        caller: UserId,
        project_id: ProjectId,
    ) -> Result<(), ProjectServiceError> {
        let result = self.repo.transaction(|repo| -> Result<(), ProjectServiceError> {
            let project = owned_project(repo, caller, project_id)?;
            let visited = repo.count_visited_places(project.id)?;
            if visited > 0 {
                return Err(ProjectValidationError::DeletionBlocked { visited }.into());
            }
            repo.delete_project(project.id)?;
            Ok(())
        });

        match &result {
            Ok(()) => info!(
                "event=project_delete module=project_service status=ok project_id={project_id}"
            ),
            Err(err) => log_failure("project_delete", err),
        }
        result
    }

    /// Updates owner-editable fields (name, description, start date).
    pub fn update_project(
        &self,
        caller: UserId,
        project_id: ProjectId,
        patch: &ProjectPatch,
    ) -> Result<ProjectDetail, ProjectServiceError> {
        let patch = ProjectPatch {
            name: patch
                .name
                .as_deref()
                .map(normalize_project_name)
                .transpose()?,
            description: patch.description.clone().map(normalize_optional_text),
            start_date: patch.start_date,
        };

        let result = self.repo.transaction(|repo| -> Result<_, ProjectServiceError> {
            owned_project(repo, caller, project_id)?;
            repo.update_project(project_id, &patch).map_err(|err| match &patch.name {
                Some(name) => name_conflict(err, name),
                None => err.into(),
            })?;
            load_detail(repo, project_id)
        });

        if let Err(err) = &result {
            log_failure("project_update", err);
        }
        result
    }

    /// Gets one project the caller owns, with its places.
    pub fn get_project(
        &self,
        caller: UserId,
        project_id: ProjectId,
    ) -> Result<ProjectDetail, ProjectServiceError> {
        owned_project(&self.repo, caller, project_id)?;
        load_detail(&self.repo, project_id)
    }

    /// Lists the caller's projects, newest first.
    pub fn list_projects(
        &self,
        caller: UserId,
        query: &PageQuery,
    ) -> Result<ProjectListResult, ProjectServiceError> {
        let projects = self.repo.list_projects(caller, query)?;
        let mut items = Vec::with_capacity(projects.len());
        for project in projects {
            let places = self.repo.list_project_places(project.id)?;
            items.push(ProjectDetail { project, places });
        }
        Ok(ProjectListResult {
            items,
            applied_limit: query.applied_limit(),
        })
    }

    /// Gets one association whose project the caller owns.
    pub fn get_project_place(
        &self,
        caller: UserId,
        association_id: ProjectPlaceId,
    ) -> Result<TravelProjectPlace, ProjectServiceError> {
        owned_association(&self.repo, caller, association_id)
    }
}

/// Re-derives `completed` for one project from its associations.
///
/// Writes only when the stored value differs. Returns whether a write
/// happened. Callers run this inside their own transaction.
pub fn recompute_completion<R: ProjectRepository>(
    repo: &R,
    project_id: ProjectId,
) -> Result<bool, ProjectServiceError> {
    let project = repo
        .get_project(project_id)?
        .ok_or(ProjectServiceError::ProjectNotFound(project_id))?;
    let completed = !repo.has_unvisited_places(project_id)?;
    if project.completed == completed {
        return Ok(false);
    }

    repo.set_project_completed(project_id, completed)?;
    info!(
        "event=project_completion module=project_service status=ok project_id={project_id} completed={completed}"
    );
    Ok(true)
}

fn owned_project<R: ProjectRepository>(
    repo: &R,
    caller: UserId,
    project_id: ProjectId,
) -> Result<TravelProject, ProjectServiceError> {
    let project = repo
        .get_project(project_id)?
        .ok_or(ProjectServiceError::ProjectNotFound(project_id))?;
    if project.owner_id != caller {
        return Err(ProjectServiceError::Forbidden {
            user_id: caller,
            project_id,
        });
    }
    Ok(project)
}

fn owned_association<R: ProjectRepository>(
    repo: &R,
    caller: UserId,
    association_id: ProjectPlaceId,
) -> Result<TravelProjectPlace, ProjectServiceError> {
    let association = repo
        .get_project_place(association_id)?
        .ok_or(ProjectServiceError::ProjectPlaceNotFound(association_id))?;
    owned_project(repo, caller, association.project_id)?;
    Ok(association)
}

fn load_detail<R: ProjectRepository>(
    repo: &R,
    project_id: ProjectId,
) -> Result<ProjectDetail, ProjectServiceError> {
    let project = repo
        .get_project(project_id)?
        .ok_or(ProjectServiceError::ProjectNotFound(project_id))?;
    let places = repo.list_project_places(project_id)?;
    Ok(ProjectDetail { project, places })
}

fn name_conflict(err: RepoError, name: &str) -> ProjectServiceError {
    match err {
        RepoError::Conflict(Conflict::ProjectName) => {
            ProjectValidationError::NameTaken(name.to_string()).into()
        }
        other => other.into(),
    }
}

fn pair_conflict(err: RepoError, project_id: ProjectId, place_id: PlaceId) -> ProjectServiceError {
    match err {
        RepoError::Conflict(Conflict::ProjectPlacePair) => {
            ProjectValidationError::AlreadyInProject {
                project_id,
                place_id,
            }
            .into()
        }
        other => other.into(),
    }
}

fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn log_failure(event: &str, err: &ProjectServiceError) {
    match err {
        ProjectServiceError::Repo(inner) => error!(
            "event={event} module=project_service status=error error_code=storage error={inner}"
        ),
        other => warn!(
            "event={event} module=project_service status=rejected reason={}",
            other.reason_code()
        ),
    }
}
