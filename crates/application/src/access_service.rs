//! Loads access inputs and evaluates them for one caller.

mod config;
mod loading;

use std::sync::Arc;

use initiative_access_core::{AppError, AppResult, UserIdentity};
use initiative_access_domain::{
    EntityKind, InitiativeId, PermissionKey, PermissionSet, ResourceRef, UserId,
};
use tracing::warn;

use crate::access_decision::{AccessState, InitiativeAccess, ResourceAccess};
use crate::{AccessDataCache, InitiativeAccessData, InitiativeDirectory};

pub use config::{AccessServiceConfig, PermissionSource};

/// Local and server permission sets side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionReport {
    /// Initiative the report covers.
    pub initiative_id: InitiativeId,
    /// Effective access after applying the configured source.
    pub access: InitiativeAccess,
    /// Locally resolved set.
    pub local: PermissionSet,
    /// Server-resolved set, when requested.
    pub server: Option<PermissionSet>,
    /// Keys on which both sets disagree.
    pub drift: Vec<PermissionKey>,
}

/// Application service evaluating initiative and resource access.
#[derive(Clone)]
pub struct AccessService {
    directory: Arc<dyn InitiativeDirectory>,
    cache: Arc<dyn AccessDataCache>,
    config: AccessServiceConfig,
}

impl AccessService {
    /// Creates a new access service.
    #[must_use]
    pub fn new(
        directory: Arc<dyn InitiativeDirectory>,
        cache: Arc<dyn AccessDataCache>,
        config: AccessServiceConfig,
    ) -> Self {
        Self {
            directory,
            cache,
            config,
        }
    }

    /// Resolves the caller's access to an initiative.
    ///
    /// Load failures produce [`AccessState::Failed`], which denies every check.
    pub async fn initiative_access(
        &self,
        identity: &UserIdentity,
        initiative_id: InitiativeId,
    ) -> AccessState<InitiativeAccess> {
        match self.load_initiative_data(identity, initiative_id).await {
            Ok(data) => AccessState::Ready(self.evaluate(&data, UserId::from(identity))),
            Err(error) => {
                warn!(
                    initiative_id = %initiative_id,
                    user_id = identity.user_id(),
                    error = %error,
                    "failed to load initiative access inputs"
                );
                AccessState::Failed(error.to_string())
            }
        }
    }

    /// Resolves the caller's access level on one resource.
    pub async fn resource_access(
        &self,
        identity: &UserIdentity,
        resource: ResourceRef,
    ) -> AccessState<ResourceAccess> {
        let snapshot = match self.load_resource(resource).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(
                    resource = %resource,
                    user_id = identity.user_id(),
                    error = %error,
                    "failed to load resource grants"
                );
                return AccessState::Failed(error.to_string());
            }
        };

        match self
            .initiative_access(identity, snapshot.resource.initiative_id)
            .await
        {
            AccessState::Ready(access) => AccessState::Ready(ResourceAccess::resolve(
                &access,
                snapshot.resource,
                snapshot.grants.as_slice(),
            )),
            AccessState::Loading => AccessState::Loading,
            AccessState::Failed(reason) => AccessState::Failed(reason),
        }
    }

    /// Ensures the caller may create entities of a kind in an initiative.
    pub async fn require_create(
        &self,
        identity: &UserIdentity,
        initiative_id: InitiativeId,
        kind: EntityKind,
    ) -> AppResult<()> {
        match self.initiative_access(identity, initiative_id).await {
            AccessState::Ready(access) if access.can_create(kind) => Ok(()),
            AccessState::Ready(_) => Err(AppError::Forbidden(format!(
                "user '{}' is missing permission '{}' in initiative '{initiative_id}'",
                identity.user_id(),
                kind.create_key().as_str()
            ))),
            AccessState::Loading => Err(AppError::Unavailable(format!(
                "access inputs for initiative '{initiative_id}' are still loading"
            ))),
            AccessState::Failed(reason) => Err(AppError::Unavailable(reason)),
        }
    }

    /// Returns local and server permission sets with their differences.
    pub async fn permission_report(
        &self,
        identity: &UserIdentity,
        initiative_id: InitiativeId,
    ) -> AppResult<PermissionReport> {
        let data = self.load_initiative_data(identity, initiative_id).await?;
        let user_id = UserId::from(identity);
        let local = InitiativeAccess::resolve(
            &data.initiative,
            user_id,
            data.guild_membership.as_ref(),
        )
        .permissions()
        .clone();
        let drift = data
            .server_permissions
            .as_ref()
            .map(|server| local.differences(server))
            .unwrap_or_default();

        Ok(PermissionReport {
            initiative_id,
            access: self.evaluate(&data, user_id),
            local,
            server: data.server_permissions,
            drift,
        })
    }

    fn evaluate(&self, data: &InitiativeAccessData, user_id: UserId) -> InitiativeAccess {
        let local = InitiativeAccess::resolve(
            &data.initiative,
            user_id,
            data.guild_membership.as_ref(),
        );

        match (self.config.permission_source, data.server_permissions.as_ref()) {
            (PermissionSource::Server, Some(server)) => {
                let drift = local.permissions().differences(server);
                if !drift.is_empty() {
                    let keys: Vec<&str> = drift.iter().map(PermissionKey::as_str).collect();
                    warn!(
                        initiative_id = %data.initiative.id(),
                        user_id = %user_id,
                        drift = ?keys,
                        "local permission resolution disagrees with server"
                    );
                }
                local.with_server_permissions(server.clone())
            }
            _ => local,
        }
    }
}

#[cfg(test)]
mod tests;
