use std::collections::HashMap;

use async_trait::async_trait;
use initiative_access_application::{
    InitiativeDirectory, PermissionSubject, ResourceCommand, ResourceCommandGateway,
    ResourceSnapshot, resolve_initiative_permissions,
};
use initiative_access_core::{AppError, AppResult, GuildId};
use initiative_access_domain::{
    GuildMembership, Initiative, InitiativeId, InitiativeRole, PermissionSet, Principal,
    ResourceId, ResourceKind, ResourceRef, RoleId, UserId,
};
use tokio::sync::RwLock;

/// In-process initiative directory and resource gateway.
///
/// Mirrors the REST API closely enough to drive the access services without a
/// network: `my-permissions` is resolved for the configured caller the same
/// way the server does.
#[derive(Debug, Default)]
pub struct InMemoryInitiativeStore {
    caller: Option<UserId>,
    initiatives: RwLock<HashMap<InitiativeId, Initiative>>,
    roles: RwLock<HashMap<InitiativeId, Vec<InitiativeRole>>>,
    guild_memberships: RwLock<HashMap<(GuildId, UserId), GuildMembership>>,
    resources: RwLock<HashMap<(ResourceKind, ResourceId), ResourceSnapshot>>,
}

impl InMemoryInitiativeStore {
    /// Creates an empty store without an authenticated caller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store answering `my-permissions` for `caller`.
    #[must_use]
    pub fn for_caller(caller: UserId) -> Self {
        Self {
            caller: Some(caller),
            ..Self::default()
        }
    }

    /// Stores an initiative and any role definitions attached to it.
    pub async fn save_initiative(&self, initiative: Initiative) {
        if !initiative.roles().is_empty() {
            self.roles
                .write()
                .await
                .insert(initiative.id(), initiative.roles().to_vec());
        }
        self.initiatives
            .write()
            .await
            .insert(initiative.id(), initiative);
    }

    /// Adds or replaces a role definition of an existing initiative.
    pub async fn save_role(&self, role: InitiativeRole) -> AppResult<()> {
        if !self
            .initiatives
            .read()
            .await
            .contains_key(&role.initiative_id())
        {
            return Err(AppError::NotFound(format!(
                "initiative '{}' does not exist",
                role.initiative_id()
            )));
        }

        let mut roles = self.roles.write().await;
        let defined = roles.entry(role.initiative_id()).or_default();
        defined.retain(|existing| existing.id() != role.id());
        defined.push(role);
        Ok(())
    }

    /// Deletes a role definition. Members keep their dangling references.
    pub async fn delete_role(&self, initiative_id: InitiativeId, role_id: RoleId) -> AppResult<()> {
        let mut roles = self.roles.write().await;
        let defined = roles.entry(initiative_id).or_default();
        let before = defined.len();
        defined.retain(|role| role.id() != role_id);

        if defined.len() == before {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' does not exist in initiative '{initiative_id}'"
            )));
        }
        Ok(())
    }

    /// Adds or replaces a guild membership.
    pub async fn save_guild_membership(&self, membership: GuildMembership) {
        self.guild_memberships
            .write()
            .await
            .insert((membership.guild_id, membership.user_id), membership);
    }

    /// Adds or replaces a resource with its grants and tags.
    pub async fn save_resource(&self, snapshot: ResourceSnapshot) {
        self.resources
            .write()
            .await
            .insert((snapshot.resource.kind, snapshot.resource.id), snapshot);
    }

    async fn role_defined(&self, initiative_id: InitiativeId, role_id: RoleId) -> bool {
        self.roles
            .read()
            .await
            .get(&initiative_id)
            .is_some_and(|roles| roles.iter().any(|role| role.id() == role_id))
    }
}

fn resource_not_found(resource: ResourceRef) -> AppError {
    AppError::NotFound(format!("resource '{resource}' does not exist"))
}

#[async_trait]
impl InitiativeDirectory for InMemoryInitiativeStore {
    async fn fetch_initiative(&self, initiative_id: InitiativeId) -> AppResult<Initiative> {
        self.initiatives
            .read()
            .await
            .get(&initiative_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!("initiative '{initiative_id}' does not exist"))
            })
    }

    async fn list_roles(&self, initiative_id: InitiativeId) -> AppResult<Vec<InitiativeRole>> {
        let mut roles = self
            .roles
            .read()
            .await
            .get(&initiative_id)
            .cloned()
            .unwrap_or_default();
        roles.sort_by_key(InitiativeRole::id);
        Ok(roles)
    }

    async fn fetch_guild_membership(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> AppResult<Option<GuildMembership>> {
        Ok(self
            .guild_memberships
            .read()
            .await
            .get(&(guild_id, user_id))
            .copied())
    }

    async fn fetch_my_permissions(&self, initiative_id: InitiativeId) -> AppResult<PermissionSet> {
        let caller = self.caller.ok_or_else(|| {
            AppError::Unauthorized("no caller is authenticated against the store".to_owned())
        })?;
        let initiative = self
            .fetch_initiative(initiative_id)
            .await?
            .with_roles(self.list_roles(initiative_id).await?)?;
        let guild_membership = self
            .fetch_guild_membership(initiative.guild_id(), caller)
            .await?;

        Ok(resolve_initiative_permissions(PermissionSubject {
            initiative: &initiative,
            user_id: caller,
            guild_membership: guild_membership.as_ref(),
        }))
    }

    async fn fetch_resource(&self, resource: ResourceRef) -> AppResult<ResourceSnapshot> {
        self.resources
            .read()
            .await
            .get(&(resource.kind, resource.id))
            .cloned()
            .ok_or_else(|| resource_not_found(resource))
    }
}

#[async_trait]
impl ResourceCommandGateway for InMemoryInitiativeStore {
    async fn execute(&self, command: ResourceCommand) -> AppResult<()> {
        let resource = command.resource();
        let initiative_id = self.fetch_resource(resource).await?.resource.initiative_id;

        if let ResourceCommand::PutGrant { grant, .. } = command
            && let Principal::Role(role_id) = grant.principal()
            && !self.role_defined(initiative_id, role_id).await
        {
            return Err(AppError::Validation(format!(
                "role '{role_id}' is not defined in initiative '{initiative_id}'"
            )));
        }

        let mut resources = self.resources.write().await;
        let snapshot = resources
            .get_mut(&(resource.kind, resource.id))
            .ok_or_else(|| resource_not_found(resource))?;

        match command {
            ResourceCommand::PutGrant { grant, .. } => {
                snapshot
                    .grants
                    .retain(|existing| existing.principal() != grant.principal());
                snapshot.grants.push(grant);
            }
            ResourceCommand::DeleteGrant { principal, .. } => {
                let before = snapshot.grants.len();
                snapshot
                    .grants
                    .retain(|existing| existing.principal() != principal);
                if snapshot.grants.len() == before {
                    return Err(AppError::NotFound(format!(
                        "'{principal}' has no grant on '{resource}'"
                    )));
                }
            }
            ResourceCommand::AddTag { tag_id, .. } => {
                snapshot.tag_ids.insert(tag_id);
            }
            ResourceCommand::RemoveTag { tag_id, .. } => {
                if !snapshot.tag_ids.remove(&tag_id) {
                    return Err(AppError::NotFound(format!(
                        "tag '{tag_id}' is not attached to '{resource}'"
                    )));
                }
            }
        }

        Ok(())
    }
}
