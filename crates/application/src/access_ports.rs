use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use initiative_access_core::{AppResult, GuildId};
use initiative_access_domain::{
    AccessLevel, GuildMembership, Initiative, InitiativeId, InitiativeRole, PermissionSet,
    Principal, ResourceGrant, ResourceKind, ResourceRef, TagId, UserId,
};

/// Everything needed to resolve one caller's initiative permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiativeAccessData {
    /// Initiative with members and role definitions attached.
    pub initiative: Initiative,
    /// Caller's guild membership, if any.
    pub guild_membership: Option<GuildMembership>,
    /// Server-resolved permission set for the caller, when it was requested.
    pub server_permissions: Option<PermissionSet>,
    /// When the snapshot was assembled.
    pub loaded_at: DateTime<Utc>,
}

/// Current grants and tags of one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSnapshot {
    /// Resource reference, carrying the initiative reported by the API.
    pub resource: ResourceRef,
    /// Direct user grants and role grants.
    pub grants: Vec<ResourceGrant>,
    /// Tags attached to the resource.
    pub tag_ids: BTreeSet<TagId>,
}

impl ResourceSnapshot {
    /// Returns the level currently granted to a principal, if any.
    #[must_use]
    pub fn level_for(&self, principal: Principal) -> Option<AccessLevel> {
        self.grants
            .iter()
            .filter(|grant| grant.principal() == principal)
            .map(ResourceGrant::level)
            .max()
    }
}

/// Single mutation against one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceCommand {
    /// Creates or replaces a grant.
    PutGrant {
        /// Target resource.
        resource: ResourceRef,
        /// Grant to store.
        grant: ResourceGrant,
    },
    /// Removes the grant held by a principal.
    DeleteGrant {
        /// Target resource.
        resource: ResourceRef,
        /// Principal losing access.
        principal: Principal,
    },
    /// Attaches a tag.
    AddTag {
        /// Target resource.
        resource: ResourceRef,
        /// Tag to attach.
        tag_id: TagId,
    },
    /// Detaches a tag.
    RemoveTag {
        /// Target resource.
        resource: ResourceRef,
        /// Tag to detach.
        tag_id: TagId,
    },
}

impl ResourceCommand {
    /// Returns the resource the command mutates.
    #[must_use]
    pub fn resource(&self) -> ResourceRef {
        match self {
            Self::PutGrant { resource, .. }
            | Self::DeleteGrant { resource, .. }
            | Self::AddTag { resource, .. }
            | Self::RemoveTag { resource, .. } => *resource,
        }
    }
}

/// Read port for initiative, role, membership and grant data.
#[async_trait]
pub trait InitiativeDirectory: Send + Sync {
    /// Loads an initiative with its members. Role definitions are not attached.
    async fn fetch_initiative(&self, initiative_id: InitiativeId) -> AppResult<Initiative>;

    /// Lists role definitions of an initiative.
    async fn list_roles(&self, initiative_id: InitiativeId) -> AppResult<Vec<InitiativeRole>>;

    /// Loads the guild membership of a user, `None` when they are not a member.
    async fn fetch_guild_membership(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> AppResult<Option<GuildMembership>>;

    /// Loads the server-resolved permission set of the authenticated caller.
    async fn fetch_my_permissions(&self, initiative_id: InitiativeId) -> AppResult<PermissionSet>;

    /// Loads the current grants and tags of a resource.
    async fn fetch_resource(&self, resource: ResourceRef) -> AppResult<ResourceSnapshot>;
}

/// Write port executing one resource mutation per call.
#[async_trait]
pub trait ResourceCommandGateway: Send + Sync {
    /// Executes one command.
    async fn execute(&self, command: ResourceCommand) -> AppResult<()>;
}

/// Cache port for loaded access data.
#[async_trait]
pub trait AccessDataCache: Send + Sync {
    /// Returns a cached initiative snapshot for a caller.
    async fn get_initiative_data(
        &self,
        initiative_id: InitiativeId,
        user_id: UserId,
    ) -> AppResult<Option<InitiativeAccessData>>;

    /// Stores an initiative snapshot for a caller.
    async fn put_initiative_data(
        &self,
        user_id: UserId,
        data: InitiativeAccessData,
        ttl_seconds: u32,
    ) -> AppResult<()>;

    /// Returns a cached resource snapshot.
    async fn get_resource(&self, resource: ResourceRef) -> AppResult<Option<ResourceSnapshot>>;

    /// Stores a resource snapshot.
    async fn put_resource(&self, snapshot: ResourceSnapshot, ttl_seconds: u32) -> AppResult<()>;

    /// Marks every cached resource of the given kinds as stale.
    async fn invalidate_resource_kinds(&self, kinds: &BTreeSet<ResourceKind>) -> AppResult<()>;
}
