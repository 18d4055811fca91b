use std::{fmt, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{ValidationError, required, wire};

/// Minimum accepted password length at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern is valid"));

/// An authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "UserRecord")]
pub struct User {
    /// Server-assigned identifier.
    pub id: String,
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: Option<String>,
    /// Role, e.g. "admin" or "contributor".
    pub role: Option<String>,
    /// When the account was created.
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct UserRecord {
    #[serde(alias = "_id", deserialize_with = "wire::id")]
    id: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default, alias = "createdAt")]
    created_at: Option<DateTime<Utc>>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            email: record.email,
            role: record.role,
            created_at: record.created_at,
        }
    }
}

/// Login credentials.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Secret.
    pub password: String,
}

impl Credentials {
    /// Create a new set of credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Check that both fields are present.
    ///
    /// # Errors
    ///
    /// Returns an error if the username or password is blank.
    pub fn validated(&self) -> Result<Self, ValidationError> {
        let username = required("username", &self.username)?.to_string();
        if self.password.is_empty() {
            return Err(ValidationError::Missing("password"));
        }
        Ok(Self {
            username,
            password: self.password.clone(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A request to create an account.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Secret.
    pub password: String,
}

impl Registration {
    /// Check the registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the username is blank, the email address is not
    /// plausible, or the password is shorter than [`MIN_PASSWORD_LENGTH`].
    pub fn validated(&self) -> Result<Self, ValidationError> {
        let username = required("username", &self.username)?.to_string();
        let email = self.email.trim();
        if !EMAIL.is_match(email) {
            return Err(ValidationError::Invalid {
                field: "email",
                reason: "must be a valid address".to_string(),
            });
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::Invalid {
                field: "password",
                reason: format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
            });
        }
        Ok(Self {
            username,
            email: email.to_string(),
            password: self.password.clone(),
        })
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn registration(email: &str, password: &str) -> Registration {
        Registration {
            username: "responder".to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn accepts_valid_registration() {
        let registration = registration(" a@b.org ", "correct horse").validated().unwrap();
        assert_eq!(registration.email, "a@b.org");
    }

    #[test_case("not-an-email"; "no at sign")]
    #[test_case("a@b"; "no domain dot")]
    #[test_case(""; "empty")]
    fn rejects_bad_email(email: &str) {
        assert!(matches!(
            registration(email, "long enough").validated(),
            Err(ValidationError::Invalid { field: "email", .. })
        ));
    }

    #[test]
    fn rejects_short_password() {
        assert!(matches!(
            registration("a@b.org", "short").validated(),
            Err(ValidationError::Invalid {
                field: "password",
                ..
            })
        ));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = Credentials::new("responder", "hunter22");
        assert!(!format!("{credentials:?}").contains("hunter22"));
    }

    #[test]
    fn reads_profile() {
        let user: User = serde_json::from_str(
            r#"{"id": 12, "username": "responder", "email": "r@x.org", "created_at": "2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(user.id, "12");
        assert_eq!(user.username, "responder");
    }
}
