//! User account model.
//!
//! Credentials and token issuance live outside the core; this model only
//! carries the profile fields that projects are owned by.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type UserId = Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Stored lower-cased; unique.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Registration input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserValidationError {
    #[error("First name was not specified")]
    FirstNameMissing,
    #[error("Last name was not specified")]
    LastNameMissing,
    #[error("invalid email address: `{0}`")]
    InvalidEmail(String),
}

impl NewUser {
    /// Returns a trimmed copy with a lower-cased email, or the first rule
    /// violation found.
    pub fn normalized(&self) -> Result<NewUser, UserValidationError> {
        let first_name = self.first_name.trim();
        if first_name.is_empty() {
            return Err(UserValidationError::FirstNameMissing);
        }
        let last_name = self.last_name.trim();
        if last_name.is_empty() {
            return Err(UserValidationError::LastNameMissing);
        }
        let email = self.email.trim().to_lowercase();
        if !EMAIL_RE.is_match(&email) {
            return Err(UserValidationError::InvalidEmail(self.email.clone()));
        }

        Ok(NewUser {
            email,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{NewUser, UserValidationError};

    fn input(email: &str, first: &str, last: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
        }
    }

    #[test]
    fn normalizes_email_case_and_whitespace() {
        let user = input(" Ada@Example.COM ", " Ada ", "Lovelace")
            .normalized()
            .unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.first_name, "Ada");
    }

    #[test]
    fn missing_names_are_reported_in_field_order() {
        assert_eq!(
            input("a@b.io", "", "").normalized().unwrap_err(),
            UserValidationError::FirstNameMissing
        );
        assert_eq!(
            input("a@b.io", "Ada", "  ").normalized().unwrap_err(),
            UserValidationError::LastNameMissing
        );
    }

    #[test]
    fn malformed_email_is_rejected() {
        for email in ["not-an-email", "@example.com", "ada@", "ada@@example.com", "ada lovelace@x"] {
            assert!(
                matches!(
                    input(email, "Ada", "Lovelace").normalized(),
                    Err(UserValidationError::InvalidEmail(_))
                ),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn dotless_domain_is_accepted() {
        let user = input("ada@localhost", "Ada", "Lovelace")
            .normalized()
            .unwrap();
        assert_eq!(user.email, "ada@localhost");
    }
}
