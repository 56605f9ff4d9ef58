//! Boolean access predicates consumed by callers.
//!
//! Everything here is a pure function of already-loaded data. Predicates on a
//! state that is still loading or failed to load are always `false`.

use initiative_access_domain::{
    AccessLevel, EntityKind, GuildMembership, Initiative, InitiativeId, MemberRoleTag,
    PermissionSet, ResourceGrant, ResourceRef, RoleId, UserId,
};

use crate::grant_resolution::{GrantResolutionInput, resolve_access_level};
use crate::permission_resolution::{PermissionSubject, resolve_initiative_permissions};

/// Where an initiative permission set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOrigin {
    /// Returned by the `my-permissions` endpoint.
    Server,
    /// Resolved locally from roles and membership flags.
    Local,
}

impl PermissionOrigin {
    /// Returns the stable display value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Local => "local",
        }
    }
}

/// Load state of an access decision input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessState<T> {
    /// Inputs are not loaded yet; nothing is known.
    Loading,
    /// Inputs could not be loaded; everything stays gated.
    Failed(String),
    /// Inputs are loaded.
    Ready(T),
}

impl<T> AccessState<T> {
    /// Returns the loaded value.
    #[must_use]
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Loading | Self::Failed(_) => None,
        }
    }

    /// Evaluates a predicate on loaded data, `false` otherwise.
    pub fn allows(&self, predicate: impl FnOnce(&T) -> bool) -> bool {
        self.ready().is_some_and(predicate)
    }
}

/// Resolved initiative-level access for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiativeAccess {
    initiative_id: InitiativeId,
    user_id: UserId,
    permissions: PermissionSet,
    origin: PermissionOrigin,
    is_guild_admin: bool,
    is_member: bool,
    is_manager: bool,
    held_role_ids: Vec<RoleId>,
}

impl InitiativeAccess {
    /// Resolves access locally from roles, membership flags and guild role.
    #[must_use]
    pub fn resolve(
        initiative: &Initiative,
        user_id: UserId,
        guild_membership: Option<&GuildMembership>,
    ) -> Self {
        let subject = PermissionSubject {
            initiative,
            user_id,
            guild_membership,
        };
        let member = initiative.member(user_id);
        let held_roles = member
            .map(|member| initiative.held_roles(member))
            .unwrap_or_default();
        let is_manager = member.is_some_and(|member| {
            member.role_tag() == MemberRoleTag::ProjectManager
                || held_roles.iter().any(|role| role.is_manager())
        });

        Self {
            initiative_id: initiative.id(),
            user_id,
            permissions: resolve_initiative_permissions(subject),
            origin: PermissionOrigin::Local,
            is_guild_admin: subject.is_guild_admin(),
            is_member: member.is_some(),
            is_manager,
            held_role_ids: held_roles.iter().map(|role| role.id()).collect(),
        }
    }

    /// Replaces the permission set with one resolved by the server.
    ///
    /// Membership, manager and role facts stay locally derived.
    #[must_use]
    pub fn with_server_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self.origin = PermissionOrigin::Server;
        self
    }

    /// Returns the initiative id.
    #[must_use]
    pub fn initiative_id(&self) -> InitiativeId {
        self.initiative_id
    }

    /// Returns the evaluated user.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the effective permission set.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Returns where the permission set came from.
    #[must_use]
    pub fn origin(&self) -> PermissionOrigin {
        self.origin
    }

    /// Returns the ids of existing roles the user holds.
    #[must_use]
    pub fn held_role_ids(&self) -> &[RoleId] {
        self.held_role_ids.as_slice()
    }

    /// Returns whether the user is a guild admin.
    #[must_use]
    pub fn is_guild_admin(&self) -> bool {
        self.is_guild_admin
    }

    /// Returns whether the user is an initiative member.
    #[must_use]
    pub fn is_member(&self) -> bool {
        self.is_member
    }

    /// Returns whether the user may see entities of a kind.
    #[must_use]
    pub fn can_view(&self, kind: EntityKind) -> bool {
        self.permissions.get(kind.view_key())
    }

    /// Returns whether the user may create entities of a kind.
    #[must_use]
    pub fn can_create(&self, kind: EntityKind) -> bool {
        self.permissions.get(kind.create_key())
    }

    /// Guild admin, or a member tagged or assigned as project manager.
    #[must_use]
    pub fn can_manage_initiative(&self) -> bool {
        self.is_guild_admin || (self.is_member && self.is_manager)
    }

    /// Returns whether resource grants are overridden to full access.
    #[must_use]
    pub fn has_resource_override(&self) -> bool {
        self.can_manage_initiative()
    }
}

/// Resolved access of one user to one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceAccess {
    resource: ResourceRef,
    level: AccessLevel,
}

impl ResourceAccess {
    /// Aggregates resource grants on top of the user's initiative access.
    #[must_use]
    pub fn resolve(
        initiative_access: &InitiativeAccess,
        resource: ResourceRef,
        grants: &[ResourceGrant],
    ) -> Self {
        let level = resolve_access_level(GrantResolutionInput {
            grants,
            user_id: initiative_access.user_id(),
            held_role_ids: initiative_access.held_role_ids(),
            has_override: initiative_access.has_resource_override(),
        });

        Self { resource, level }
    }

    /// Returns the resource.
    #[must_use]
    pub fn resource(&self) -> ResourceRef {
        self.resource
    }

    /// Returns the effective level.
    #[must_use]
    pub fn level(&self) -> AccessLevel {
        self.level
    }

    /// Read, write or owner.
    #[must_use]
    pub fn can_view(&self) -> bool {
        self.level.can_read()
    }

    /// Write or owner.
    #[must_use]
    pub fn can_edit(&self) -> bool {
        self.level.can_write()
    }

    /// Write or owner.
    #[must_use]
    pub fn can_manage(&self) -> bool {
        self.level.can_write()
    }

    /// Owner only; required for sharing and deletion.
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.level == AccessLevel::Owner
    }
}
