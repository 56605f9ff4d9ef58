//! User accounts as seen by the access layer.

use initiative_access_core::{AppError, AppResult, NonEmptyString, PlatformRole};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// The value is trimmed and lowercased. It must contain exactly one `@`
    /// with a non-empty local part and a domain holding at least one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let normalized = value.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        };

        if domain.contains('@') {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one inner '.'".to_owned(),
            ));
        }

        Ok(Self(normalized))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Account summary embedded in membership payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    email: EmailAddress,
    display_name: NonEmptyString,
    role: PlatformRole,
}

impl User {
    /// Creates a user summary.
    #[must_use]
    pub fn new(
        id: UserId,
        email: EmailAddress,
        display_name: NonEmptyString,
        role: PlatformRole,
    ) -> Self {
        Self {
            id,
            email,
            display_name,
            role,
        }
    }

    /// Returns the user id.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the normalized email.
    #[must_use]
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the platform-wide role.
    #[must_use]
    pub fn role(&self) -> PlatformRole {
        self.role
    }
}

#[cfg(test)]
mod tests {
    use super::EmailAddress;

    #[test]
    fn valid_email_is_normalized() {
        let email = EmailAddress::new("  Ada@Example.COM ");
        assert_eq!(
            email.ok().map(String::from),
            Some("ada@example.com".to_owned())
        );
    }

    #[test]
    fn email_without_at_is_rejected() {
        assert!(EmailAddress::new("ada.example.com").is_err());
    }

    #[test]
    fn email_with_two_ats_is_rejected() {
        assert!(EmailAddress::new("ada@lab@example.com").is_err());
    }

    #[test]
    fn email_without_domain_dot_is_rejected() {
        assert!(EmailAddress::new("ada@localhost").is_err());
    }
}
