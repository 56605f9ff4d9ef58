use initiative_access_core::GuildId;
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Role a user holds in a guild, independent of any initiative role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuildRole {
    /// Administers the guild and everything in it.
    Admin,
    /// Regular guild member.
    Member,
}

impl GuildRole {
    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

/// A user's membership in a guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMembership {
    /// Guild the membership belongs to.
    pub guild_id: GuildId,
    /// Member user.
    pub user_id: UserId,
    /// Guild-level role.
    pub role: GuildRole,
}

impl GuildMembership {
    /// Returns whether the membership carries the guild admin override.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == GuildRole::Admin
    }
}
