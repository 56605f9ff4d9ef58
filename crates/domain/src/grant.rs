use std::fmt::{Display, Formatter};
use std::str::FromStr;

use initiative_access_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::{EntityKind, InitiativeId, ResourceId, RoleId, UserId};

/// Effective access a principal holds on one resource.
///
/// Variants are ordered so that `max` picks the most privileged level.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// No access.
    #[default]
    None,
    /// May view the resource.
    Read,
    /// May edit the resource.
    Write,
    /// Full control including sharing and deletion.
    Owner,
}

impl AccessLevel {
    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Read => "read",
            Self::Write => "write",
            Self::Owner => "owner",
        }
    }

    /// Returns whether the level allows viewing.
    #[must_use]
    pub fn can_read(&self) -> bool {
        *self >= Self::Read
    }

    /// Returns whether the level allows editing.
    #[must_use]
    pub fn can_write(&self) -> bool {
        *self >= Self::Write
    }
}

impl Display for AccessLevel {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "none" => Ok(Self::None),
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "owner" => Ok(Self::Owner),
            _ => Err(AppError::Validation(format!(
                "unknown access level '{value}'"
            ))),
        }
    }
}

/// Kind of resource that carries grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A document.
    Document,
    /// A project.
    Project,
    /// A queue.
    Queue,
}

impl ResourceKind {
    /// Returns the REST collection segment for this kind.
    #[must_use]
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Document => "documents",
            Self::Project => "projects",
            Self::Queue => "queues",
        }
    }

    /// Returns the permission family for this kind.
    #[must_use]
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            Self::Document => EntityKind::Docs,
            Self::Project => EntityKind::Projects,
            Self::Queue => EntityKind::Queues,
        }
    }
}

impl FromStr for ResourceKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "document" | "documents" => Ok(Self::Document),
            "project" | "projects" => Ok(Self::Project),
            "queue" | "queues" => Ok(Self::Queue),
            _ => Err(AppError::Validation(format!(
                "unknown resource kind '{value}'"
            ))),
        }
    }
}

/// A resource together with the initiative that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource id.
    pub id: ResourceId,
    /// Owning initiative.
    pub initiative_id: InitiativeId,
}

impl ResourceRef {
    /// Creates a resource reference.
    #[must_use]
    pub fn new(kind: ResourceKind, id: ResourceId, initiative_id: InitiativeId) -> Self {
        Self {
            kind,
            id,
            initiative_id,
        }
    }
}

impl Display for ResourceRef {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}/{}", self.kind.collection(), self.id)
    }
}

/// Subject of a resource grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Principal {
    /// A single user.
    User(UserId),
    /// Every holder of an initiative role.
    Role(RoleId),
}

impl Display for Principal {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(user_id) => write!(formatter, "user:{user_id}"),
            Self::Role(role_id) => write!(formatter, "role:{role_id}"),
        }
    }
}

/// Explicit access record on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceGrant {
    principal: Principal,
    level: AccessLevel,
}

impl ResourceGrant {
    /// Creates a validated grant.
    ///
    /// `Owner` is only valid for user principals and `None` is never stored.
    pub fn new(principal: Principal, level: AccessLevel) -> AppResult<Self> {
        if level == AccessLevel::None {
            return Err(AppError::Validation(format!(
                "grant for '{principal}' must carry a level above 'none'"
            )));
        }

        if matches!(principal, Principal::Role(_)) && level == AccessLevel::Owner {
            return Err(AppError::Validation(format!(
                "role grant for '{principal}' cannot carry 'owner'"
            )));
        }

        Ok(Self { principal, level })
    }

    /// Returns the grant subject.
    #[must_use]
    pub fn principal(&self) -> Principal {
        self.principal
    }

    /// Returns the granted level.
    #[must_use]
    pub fn level(&self) -> AccessLevel {
        self.level
    }
}
