use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use initiative_access_core::{AppError, AppResult, GuildId, PlatformRole, UserIdentity};
use initiative_access_domain::{
    AccessLevel, EntityKind, GuildMembership, GuildRole, Initiative, InitiativeId, InitiativeRole,
    PermissionKey, PermissionSet, Principal, ResourceGrant, ResourceId, ResourceKind, ResourceRef,
    RoleId, UserId,
};
use tokio::sync::Mutex;

use crate::access_decision::{AccessState, PermissionOrigin};
use crate::fixtures::{GUILD, guild_membership, initiative, member, role};
use crate::{AccessDataCache, InitiativeAccessData, InitiativeDirectory, ResourceSnapshot};

use super::{AccessService, AccessServiceConfig, PermissionSource};

#[derive(Default)]
struct FakeDirectory {
    initiatives: HashMap<InitiativeId, Initiative>,
    roles: HashMap<InitiativeId, Vec<InitiativeRole>>,
    guild_memberships: HashMap<UserId, GuildMembership>,
    server_permissions: HashMap<InitiativeId, PermissionSet>,
    resources: HashMap<ResourceId, ResourceSnapshot>,
    offline: bool,
    initiative_fetches: Mutex<u32>,
    permission_fetches: Mutex<u32>,
}

#[async_trait]
impl InitiativeDirectory for FakeDirectory {
    async fn fetch_initiative(&self, initiative_id: InitiativeId) -> AppResult<Initiative> {
        *self.initiative_fetches.lock().await += 1;
        if self.offline {
            return Err(AppError::Unavailable("connection refused".to_owned()));
        }

        self.initiatives
            .get(&initiative_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("initiative '{initiative_id}'")))
    }

    async fn list_roles(&self, initiative_id: InitiativeId) -> AppResult<Vec<InitiativeRole>> {
        Ok(self.roles.get(&initiative_id).cloned().unwrap_or_default())
    }

    async fn fetch_guild_membership(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
    ) -> AppResult<Option<GuildMembership>> {
        Ok(self.guild_memberships.get(&user_id).copied())
    }

    async fn fetch_my_permissions(&self, initiative_id: InitiativeId) -> AppResult<PermissionSet> {
        *self.permission_fetches.lock().await += 1;
        Ok(self
            .server_permissions
            .get(&initiative_id)
            .cloned()
            .unwrap_or_else(PermissionSet::empty))
    }

    async fn fetch_resource(&self, resource: ResourceRef) -> AppResult<ResourceSnapshot> {
        self.resources
            .get(&resource.id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("resource '{resource}'")))
    }
}

#[derive(Default)]
struct FakeCache {
    initiatives: Mutex<HashMap<(InitiativeId, UserId), InitiativeAccessData>>,
    resources: Mutex<HashMap<ResourceId, ResourceSnapshot>>,
}

#[async_trait]
impl AccessDataCache for FakeCache {
    async fn get_initiative_data(
        &self,
        initiative_id: InitiativeId,
        user_id: UserId,
    ) -> AppResult<Option<InitiativeAccessData>> {
        Ok(self
            .initiatives
            .lock()
            .await
            .get(&(initiative_id, user_id))
            .cloned())
    }

    async fn put_initiative_data(
        &self,
        user_id: UserId,
        data: InitiativeAccessData,
        _ttl_seconds: u32,
    ) -> AppResult<()> {
        self.initiatives
            .lock()
            .await
            .insert((data.initiative.id(), user_id), data);
        Ok(())
    }

    async fn get_resource(&self, resource: ResourceRef) -> AppResult<Option<ResourceSnapshot>> {
        Ok(self.resources.lock().await.get(&resource.id).cloned())
    }

    async fn put_resource(&self, snapshot: ResourceSnapshot, _ttl_seconds: u32) -> AppResult<()> {
        self.resources
            .lock()
            .await
            .insert(snapshot.resource.id, snapshot);
        Ok(())
    }

    async fn invalidate_resource_kinds(&self, kinds: &BTreeSet<ResourceKind>) -> AppResult<()> {
        self.resources
            .lock()
            .await
            .retain(|_, snapshot| !kinds.contains(&snapshot.resource.kind));
        Ok(())
    }
}

fn identity(user_id: i64) -> UserIdentity {
    UserIdentity::new(
        user_id,
        "Ada",
        None,
        PlatformRole::Member,
        GuildId::new(GUILD),
    )
}

fn document(initiative_id: i64) -> ResourceRef {
    ResourceRef::new(
        ResourceKind::Document,
        ResourceId::new(5),
        InitiativeId::new(initiative_id),
    )
}

fn grant(principal: Principal, level: AccessLevel) -> ResourceGrant {
    ResourceGrant::new(principal, level).unwrap_or_else(|_| unreachable!())
}

fn directory_with_writer() -> FakeDirectory {
    let writer = role(
        4,
        10,
        "writer",
        &[PermissionKey::ViewDocs, PermissionKey::CreateDocs],
    );
    let mut directory = FakeDirectory::default();
    directory.initiatives.insert(
        InitiativeId::new(10),
        initiative(10, vec![member(7, &[4])], Vec::new()),
    );
    directory.roles.insert(InitiativeId::new(10), vec![writer]);
    directory
        .guild_memberships
        .insert(UserId::new(7), guild_membership(7, GuildRole::Member));
    directory
}

fn service(
    directory: FakeDirectory,
    source: PermissionSource,
) -> (AccessService, Arc<FakeDirectory>) {
    let directory = Arc::new(directory);
    let service = AccessService::new(
        directory.clone(),
        Arc::new(FakeCache::default()),
        AccessServiceConfig {
            permission_source: source,
            cache_ttl_seconds: 30,
        },
    );
    (service, directory)
}

#[tokio::test]
async fn local_source_resolves_roles_without_server_call() {
    let (service, directory) = service(directory_with_writer(), PermissionSource::Local);

    let state = service
        .initiative_access(&identity(7), InitiativeId::new(10))
        .await;

    assert!(state.allows(|access| access.can_create(EntityKind::Docs)));
    assert!(state.allows(|access| access.origin() == PermissionOrigin::Local));
    assert_eq!(*directory.permission_fetches.lock().await, 0);
}

#[tokio::test]
async fn server_source_is_authoritative() {
    let mut directory = directory_with_writer();
    directory.server_permissions.insert(
        InitiativeId::new(10),
        PermissionSet::from_pairs([(PermissionKey::ViewDocs, true)]),
    );
    let (service, _) = service(directory, PermissionSource::Server);

    let state = service
        .initiative_access(&identity(7), InitiativeId::new(10))
        .await;

    assert!(state.allows(|access| access.can_view(EntityKind::Docs)));
    assert!(!state.allows(|access| access.can_create(EntityKind::Docs)));
}

#[tokio::test]
async fn permission_report_lists_drift() {
    let mut directory = directory_with_writer();
    directory.server_permissions.insert(
        InitiativeId::new(10),
        PermissionSet::from_pairs([(PermissionKey::ViewDocs, true)]),
    );
    let (service, _) = service(directory, PermissionSource::Server);

    let report = service
        .permission_report(&identity(7), InitiativeId::new(10))
        .await;
    assert!(report.is_ok());

    let report = report.unwrap_or_else(|_| unreachable!());
    assert_eq!(report.drift, vec![PermissionKey::CreateDocs]);
    assert!(report.local.get(PermissionKey::CreateDocs));
}

#[tokio::test]
async fn network_failure_gates_everything() {
    let mut directory = directory_with_writer();
    directory.offline = true;
    let (service, _) = service(directory, PermissionSource::Local);

    let state = service
        .initiative_access(&identity(7), InitiativeId::new(10))
        .await;

    assert!(matches!(state, AccessState::Failed(_)));
    assert!(!state.allows(|access| access.can_view(EntityKind::Docs)));
}

#[tokio::test]
async fn second_lookup_is_served_from_cache() {
    let (service, directory) = service(directory_with_writer(), PermissionSource::Local);

    let _ = service
        .initiative_access(&identity(7), InitiativeId::new(10))
        .await;
    let _ = service
        .initiative_access(&identity(7), InitiativeId::new(10))
        .await;

    assert_eq!(*directory.initiative_fetches.lock().await, 1);
}

#[tokio::test]
async fn require_create_reports_missing_permission() {
    let (service, _) = service(directory_with_writer(), PermissionSource::Local);

    let allowed = service
        .require_create(&identity(7), InitiativeId::new(10), EntityKind::Docs)
        .await;
    let denied = service
        .require_create(&identity(7), InitiativeId::new(10), EntityKind::Projects)
        .await;

    assert!(allowed.is_ok());
    assert!(matches!(denied, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn resource_access_takes_highest_grant() {
    let mut directory = directory_with_writer();
    directory.resources.insert(
        ResourceId::new(5),
        ResourceSnapshot {
            resource: document(10),
            grants: vec![
                grant(Principal::User(UserId::new(7)), AccessLevel::Read),
                grant(Principal::Role(RoleId::new(4)), AccessLevel::Write),
            ],
            tag_ids: BTreeSet::new(),
        },
    );
    let (service, _) = service(directory, PermissionSource::Local);

    let state = service.resource_access(&identity(7), document(10)).await;

    assert_eq!(
        state.ready().map(|access| access.level()),
        Some(AccessLevel::Write)
    );
}

#[tokio::test]
async fn guild_admin_owns_resources_without_grants() {
    let mut directory = directory_with_writer();
    directory
        .guild_memberships
        .insert(UserId::new(9), guild_membership(9, GuildRole::Admin));
    directory.resources.insert(
        ResourceId::new(5),
        ResourceSnapshot {
            resource: document(10),
            grants: Vec::new(),
            tag_ids: BTreeSet::new(),
        },
    );
    let (service, _) = service(directory, PermissionSource::Local);

    let state = service.resource_access(&identity(9), document(10)).await;

    assert!(state.allows(|access| access.is_owner()));
}
