use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::GuildId;

/// Platform-wide role assigned to an account, independent of any guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformRole {
    /// Operates the whole platform.
    Admin,
    /// Regular account.
    Member,
}

impl PlatformRole {
    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl Display for PlatformRole {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// The authenticated caller on whose behalf access is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    user_id: i64,
    display_name: String,
    email: Option<String>,
    platform_role: PlatformRole,
    guild_id: GuildId,
}

impl UserIdentity {
    /// Creates a user identity from authentication and guild data.
    #[must_use]
    pub fn new(
        user_id: i64,
        display_name: impl Into<String>,
        email: Option<String>,
        platform_role: PlatformRole,
        guild_id: GuildId,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            email,
            platform_role,
            guild_id,
        }
    }

    /// Returns the numeric user id issued by the backend.
    #[must_use]
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email, if the backend returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the platform-wide role.
    #[must_use]
    pub fn platform_role(&self) -> PlatformRole {
        self.platform_role
    }

    /// Returns the guild the identity is currently acting in.
    #[must_use]
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }
}
