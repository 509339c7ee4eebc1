//! User registration and profile service.
//!
//! Password handling and token issuance belong to the external auth layer;
//! this service only owns the profile record projects are attached to.

use crate::model::user::{NewUser, User, UserId, UserValidationError};
use crate::repo::user_repo::UserRepository;
use crate::repo::{Conflict, RepoError};
use log::{info, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error(transparent)]
    Validation(#[from] UserValidationError),
    #[error("a user with email `{0}` already exists")]
    EmailTaken(String),
    #[error("user not found: {0}")]
    UserNotFound(UserId),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new user after field validation.
    pub fn register(&self, input: &NewUser) -> Result<User, UserServiceError> {
        let normalized = match input.normalized() {
            Ok(value) => value,
            Err(err) => {
                warn!("event=user_register module=user_service status=rejected reason=validation");
                return Err(err.into());
            }
        };

        let user = self.repo.create_user(&normalized).map_err(|err| match err {
            RepoError::Conflict(Conflict::UserEmail) => {
                UserServiceError::EmailTaken(normalized.email.clone())
            }
            other => other.into(),
        })?;

        info!(
            "event=user_register module=user_service status=ok user_id={}",
            user.id
        );
        Ok(user)
    }

    /// Returns the profile of an authenticated user.
    pub fn profile(&self, user_id: UserId) -> Result<User, UserServiceError> {
        self.repo
            .get_user(user_id)?
            .ok_or(UserServiceError::UserNotFound(user_id))
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self.repo.find_user_by_email(email)?)
    }
}
