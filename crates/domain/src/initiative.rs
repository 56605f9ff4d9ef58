use std::collections::BTreeSet;

use initiative_access_core::{AppError, AppResult, GuildId, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::{InitiativeId, PermissionKey, PermissionSet, RoleId, User, UserId};

/// Per-member boolean flags that predate role-based permissions.
///
/// Each flag is nullable; interpretation of absent values belongs to the
/// legacy permission resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyPermissionFlags {
    /// Document visibility flag.
    pub can_view_docs: Option<bool>,
    /// Document creation flag.
    pub can_create_docs: Option<bool>,
    /// Project visibility flag.
    pub can_view_projects: Option<bool>,
    /// Project creation flag.
    pub can_create_projects: Option<bool>,
    /// Queue visibility flag.
    pub can_view_queues: Option<bool>,
    /// Queue creation flag.
    pub can_create_queues: Option<bool>,
}

impl LegacyPermissionFlags {
    /// Returns the raw flag stored for a key.
    #[must_use]
    pub fn value(&self, key: PermissionKey) -> Option<bool> {
        match key {
            PermissionKey::ViewDocs => self.can_view_docs,
            PermissionKey::CreateDocs => self.can_create_docs,
            PermissionKey::ViewProjects => self.can_view_projects,
            PermissionKey::CreateProjects => self.can_create_projects,
            PermissionKey::ViewQueues => self.can_view_queues,
            PermissionKey::CreateQueues => self.can_create_queues,
        }
    }
}

/// Coarse role tag carried by every initiative membership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRoleTag {
    /// Manages the initiative.
    ProjectManager,
    /// Regular participant.
    #[default]
    Member,
}

/// Named bundle of permission keys defined inside one initiative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeRole {
    id: RoleId,
    initiative_id: InitiativeId,
    name: NonEmptyString,
    display_name: NonEmptyString,
    is_manager: bool,
    permissions: PermissionSet,
}

impl InitiativeRole {
    /// Creates a role definition.
    #[must_use]
    pub fn new(
        id: RoleId,
        initiative_id: InitiativeId,
        name: NonEmptyString,
        display_name: NonEmptyString,
        is_manager: bool,
        permissions: PermissionSet,
    ) -> Self {
        Self {
            id,
            initiative_id,
            name,
            display_name,
            is_manager,
            permissions,
        }
    }

    /// Returns the role id.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the initiative that defines this role.
    #[must_use]
    pub fn initiative_id(&self) -> InitiativeId {
        self.initiative_id
    }

    /// Returns the machine name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the human-facing name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns whether holders of this role manage the initiative.
    #[must_use]
    pub fn is_manager(&self) -> bool {
        self.is_manager
    }

    /// Returns the role's permission flags.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }
}

/// Join record linking a user to an initiative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeMember {
    user: User,
    role_ids: Vec<RoleId>,
    role_tag: MemberRoleTag,
    legacy_flags: LegacyPermissionFlags,
}

impl InitiativeMember {
    /// Creates a membership record. Duplicate role references are dropped.
    #[must_use]
    pub fn new(
        user: User,
        role_ids: Vec<RoleId>,
        role_tag: MemberRoleTag,
        legacy_flags: LegacyPermissionFlags,
    ) -> Self {
        let mut seen = BTreeSet::new();
        let role_ids = role_ids
            .into_iter()
            .filter(|role_id| seen.insert(*role_id))
            .collect();

        Self {
            user,
            role_ids,
            role_tag,
            legacy_flags,
        }
    }

    /// Returns the member's user summary.
    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Returns the member's user id.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user.id()
    }

    /// Returns the roles referenced by this membership, in assignment order.
    #[must_use]
    pub fn role_ids(&self) -> &[RoleId] {
        self.role_ids.as_slice()
    }

    /// Returns the coarse role tag.
    #[must_use]
    pub fn role_tag(&self) -> MemberRoleTag {
        self.role_tag
    }

    /// Returns the legacy permission flags.
    #[must_use]
    pub fn legacy_flags(&self) -> &LegacyPermissionFlags {
        &self.legacy_flags
    }
}

/// Workspace inside a guild with its members and role definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initiative {
    id: InitiativeId,
    guild_id: GuildId,
    name: NonEmptyString,
    members: Vec<InitiativeMember>,
    roles: Vec<InitiativeRole>,
}

impl Initiative {
    /// Creates an initiative without role definitions.
    ///
    /// Fails when the same user appears twice in `members`.
    pub fn new(
        id: InitiativeId,
        guild_id: GuildId,
        name: NonEmptyString,
        members: Vec<InitiativeMember>,
    ) -> AppResult<Self> {
        let mut seen = BTreeSet::new();
        for member in &members {
            if !seen.insert(member.user_id()) {
                return Err(AppError::Validation(format!(
                    "user '{}' appears more than once in initiative '{id}'",
                    member.user_id()
                )));
            }
        }

        Ok(Self {
            id,
            guild_id,
            name,
            members,
            roles: Vec::new(),
        })
    }

    /// Attaches the initiative's role definitions.
    ///
    /// Every role must be scoped to this initiative and role ids must be unique.
    pub fn with_roles(mut self, roles: Vec<InitiativeRole>) -> AppResult<Self> {
        let mut seen = BTreeSet::new();
        for role in &roles {
            if role.initiative_id() != self.id {
                return Err(AppError::Validation(format!(
                    "role '{}' belongs to initiative '{}', not '{}'",
                    role.id(),
                    role.initiative_id(),
                    self.id
                )));
            }
            if !seen.insert(role.id()) {
                return Err(AppError::Validation(format!(
                    "role '{}' is defined more than once in initiative '{}'",
                    role.id(),
                    self.id
                )));
            }
        }

        self.roles = roles;
        Ok(self)
    }

    /// Returns the initiative id.
    #[must_use]
    pub fn id(&self) -> InitiativeId {
        self.id
    }

    /// Returns the owning guild.
    #[must_use]
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Returns the initiative name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns members in their stored order.
    #[must_use]
    pub fn members(&self) -> &[InitiativeMember] {
        self.members.as_slice()
    }

    /// Returns role definitions in their stored order.
    #[must_use]
    pub fn roles(&self) -> &[InitiativeRole] {
        self.roles.as_slice()
    }

    /// Finds the membership record of a user.
    #[must_use]
    pub fn member(&self, user_id: UserId) -> Option<&InitiativeMember> {
        self.members
            .iter()
            .find(|member| member.user_id() == user_id)
    }

    /// Finds a role definition by id.
    #[must_use]
    pub fn role(&self, role_id: RoleId) -> Option<&InitiativeRole> {
        self.roles.iter().find(|role| role.id() == role_id)
    }

    /// Returns the role definitions a member currently holds.
    ///
    /// References to deleted roles are skipped.
    #[must_use]
    pub fn held_roles(&self, member: &InitiativeMember) -> Vec<&InitiativeRole> {
        member
            .role_ids()
            .iter()
            .filter_map(|role_id| self.role(*role_id))
            .collect()
    }
}
