use chrono::Utc;
use initiative_access_domain::PermissionSet;
use tracing::{debug, warn};

use crate::ResourceSnapshot;

use super::*;

impl AccessService {
    /// Returns the caller's initiative snapshot, from cache when fresh.
    pub(crate) async fn load_initiative_data(
        &self,
        identity: &UserIdentity,
        initiative_id: InitiativeId,
    ) -> AppResult<InitiativeAccessData> {
        let user_id = UserId::from(identity);

        match self.cache.get_initiative_data(initiative_id, user_id).await {
            Ok(Some(data)) if self.cached_data_matches_source(&data) => return Ok(data),
            Ok(_) => {}
            Err(error) => warn!(
                initiative_id = %initiative_id,
                error = %error,
                "access data cache lookup failed"
            ),
        }

        let (initiative, roles, guild_membership, server_permissions) = tokio::try_join!(
            self.directory.fetch_initiative(initiative_id),
            self.directory.list_roles(initiative_id),
            self.directory
                .fetch_guild_membership(identity.guild_id(), user_id),
            self.fetch_server_permissions(initiative_id),
        )?;

        let data = InitiativeAccessData {
            initiative: initiative.with_roles(roles)?,
            guild_membership,
            server_permissions,
            loaded_at: Utc::now(),
        };
        debug!(
            initiative_id = %initiative_id,
            user_id = %user_id,
            members = data.initiative.members().len(),
            roles = data.initiative.roles().len(),
            "loaded initiative access inputs"
        );

        if self.config.cache_ttl_seconds > 0
            && let Err(error) = self
                .cache
                .put_initiative_data(user_id, data.clone(), self.config.cache_ttl_seconds)
                .await
        {
            warn!(
                initiative_id = %initiative_id,
                error = %error,
                "failed to cache initiative access inputs"
            );
        }

        Ok(data)
    }

    /// Returns a resource snapshot, from cache when fresh.
    pub(crate) async fn load_resource(&self, resource: ResourceRef) -> AppResult<ResourceSnapshot> {
        match self.cache.get_resource(resource).await {
            Ok(Some(snapshot)) => return Ok(snapshot),
            Ok(None) => {}
            Err(error) => warn!(
                resource = %resource,
                error = %error,
                "resource cache lookup failed"
            ),
        }

        let snapshot = self.directory.fetch_resource(resource).await?;

        if self.config.cache_ttl_seconds > 0
            && let Err(error) = self
                .cache
                .put_resource(snapshot.clone(), self.config.cache_ttl_seconds)
                .await
        {
            warn!(
                resource = %resource,
                error = %error,
                "failed to cache resource snapshot"
            );
        }

        Ok(snapshot)
    }

    async fn fetch_server_permissions(
        &self,
        initiative_id: InitiativeId,
    ) -> AppResult<Option<PermissionSet>> {
        match self.config.permission_source {
            PermissionSource::Server => self
                .directory
                .fetch_my_permissions(initiative_id)
                .await
                .map(Some),
            PermissionSource::Local => Ok(None),
        }
    }

    fn cached_data_matches_source(&self, data: &InitiativeAccessData) -> bool {
        match self.config.permission_source {
            PermissionSource::Server => data.server_permissions.is_some(),
            PermissionSource::Local => true,
        }
    }
}
