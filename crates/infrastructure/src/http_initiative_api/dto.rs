use std::collections::BTreeSet;

use initiative_access_application::ResourceSnapshot;
use initiative_access_core::{
    AppError, AppResult, GuildId, NonEmptyString, PlatformRole, UserIdentity,
};
use initiative_access_domain::{
    AccessLevel, EmailAddress, GuildMembership, GuildRole, Initiative, InitiativeId,
    InitiativeMember, InitiativeRole, LegacyPermissionFlags, MemberRoleTag, PermissionKey,
    PermissionSet, Principal, ResourceGrant, ResourceId, ResourceRef, RoleId, TagId, User,
    UserId,
};
use serde::{Deserialize, Serialize};

fn invalid_payload(context: &str, error: AppError) -> AppError {
    AppError::Internal(format!("invalid {context} payload: {error}"))
}

/// Six nullable permission booleans shared by role and membership payloads.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(super) struct PermissionFlagsDto {
    #[serde(default)]
    can_view_docs: Option<bool>,
    #[serde(default)]
    can_create_docs: Option<bool>,
    #[serde(default)]
    can_view_projects: Option<bool>,
    #[serde(default)]
    can_create_projects: Option<bool>,
    #[serde(default)]
    can_view_queues: Option<bool>,
    #[serde(default)]
    can_create_queues: Option<bool>,
}

impl PermissionFlagsDto {
    fn legacy_flags(self) -> LegacyPermissionFlags {
        LegacyPermissionFlags {
            can_view_docs: self.can_view_docs,
            can_create_docs: self.can_create_docs,
            can_view_projects: self.can_view_projects,
            can_create_projects: self.can_create_projects,
            can_view_queues: self.can_view_queues,
            can_create_queues: self.can_create_queues,
        }
    }

    /// Role and server flags are taken verbatim; a missing flag is denied.
    pub(super) fn permission_set(self) -> PermissionSet {
        let flags = self.legacy_flags();
        PermissionSet::from_pairs(
            PermissionKey::all()
                .iter()
                .map(|key| (*key, flags.value(*key).unwrap_or(false))),
        )
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct UserDto {
    id: i64,
    email: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    role: Option<PlatformRole>,
}

impl UserDto {
    fn display_name(&self) -> AppResult<NonEmptyString> {
        match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => NonEmptyString::new(name),
            _ => NonEmptyString::new(self.email.as_str()),
        }
    }

    fn into_user(self) -> AppResult<User> {
        let display_name = self.display_name()?;
        Ok(User::new(
            UserId::new(self.id),
            EmailAddress::new(self.email)?,
            display_name,
            self.role.unwrap_or(PlatformRole::Member),
        ))
    }

    pub(super) fn into_identity(self, guild_id: GuildId) -> AppResult<UserIdentity> {
        let user = self
            .into_user()
            .map_err(|error| invalid_payload("current user", error))?;
        Ok(UserIdentity::new(
            user.id().value(),
            user.display_name(),
            Some(user.email().as_str().to_owned()),
            user.role(),
            guild_id,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct InitiativeMemberDto {
    user: UserDto,
    #[serde(default)]
    role_id: Option<i64>,
    #[serde(default)]
    role_ids: Vec<i64>,
    #[serde(default)]
    role: Option<MemberRoleTag>,
    #[serde(flatten)]
    flags: PermissionFlagsDto,
}

impl InitiativeMemberDto {
    fn into_member(self) -> AppResult<InitiativeMember> {
        let role_ids = self
            .role_id
            .into_iter()
            .chain(self.role_ids)
            .map(RoleId::new)
            .collect();

        Ok(InitiativeMember::new(
            self.user.into_user()?,
            role_ids,
            self.role.unwrap_or_default(),
            self.flags.legacy_flags(),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct InitiativeDto {
    id: i64,
    guild_id: i64,
    name: String,
    #[serde(default)]
    members: Vec<InitiativeMemberDto>,
}

impl TryFrom<InitiativeDto> for Initiative {
    type Error = AppError;

    fn try_from(value: InitiativeDto) -> Result<Self, Self::Error> {
        let convert = || -> AppResult<Initiative> {
            let members = value
                .members
                .into_iter()
                .map(InitiativeMemberDto::into_member)
                .collect::<AppResult<Vec<_>>>()?;

            Initiative::new(
                InitiativeId::new(value.id),
                GuildId::new(value.guild_id),
                NonEmptyString::new(value.name)?,
                members,
            )
        };

        convert().map_err(|error| invalid_payload("initiative", error))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct InitiativeRoleDto {
    id: i64,
    initiative_id: i64,
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    is_manager: bool,
    #[serde(flatten)]
    flags: PermissionFlagsDto,
}

impl TryFrom<InitiativeRoleDto> for InitiativeRole {
    type Error = AppError;

    fn try_from(value: InitiativeRoleDto) -> Result<Self, Self::Error> {
        let name = NonEmptyString::new(value.name)
            .map_err(|error| invalid_payload("initiative role", error))?;
        let display_name = match value.display_name {
            Some(display_name) if !display_name.trim().is_empty() => {
                NonEmptyString::new(display_name)
                    .map_err(|error| invalid_payload("initiative role", error))?
            }
            _ => name.clone(),
        };

        Ok(InitiativeRole::new(
            RoleId::new(value.id),
            InitiativeId::new(value.initiative_id),
            name,
            display_name,
            value.is_manager,
            value.flags.permission_set(),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct GuildMembershipDto {
    guild_id: i64,
    user_id: i64,
    role: GuildRole,
}

impl From<GuildMembershipDto> for GuildMembership {
    fn from(value: GuildMembershipDto) -> Self {
        Self {
            guild_id: GuildId::new(value.guild_id),
            user_id: UserId::new(value.user_id),
            role: value.role,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserGrantDto {
    user_id: i64,
    level: AccessLevel,
}

#[derive(Debug, Deserialize)]
struct RoleGrantDto {
    role_id: i64,
    level: AccessLevel,
}

#[derive(Debug, Deserialize)]
struct TagDto {
    id: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct ResourceDto {
    id: i64,
    initiative_id: i64,
    #[serde(default)]
    permissions: Vec<UserGrantDto>,
    #[serde(default)]
    role_permissions: Vec<RoleGrantDto>,
    #[serde(default)]
    tags: Vec<TagDto>,
}

impl ResourceDto {
    /// Converts the payload, keeping the kind of the requested resource.
    pub(super) fn into_snapshot(self, requested: ResourceRef) -> AppResult<ResourceSnapshot> {
        if self.id != requested.id.value() {
            return Err(AppError::Internal(format!(
                "requested resource '{requested}' but received id '{}'",
                self.id
            )));
        }

        let user_grants = self.permissions.into_iter().map(|grant| {
            ResourceGrant::new(Principal::User(UserId::new(grant.user_id)), grant.level)
        });
        let role_grants = self.role_permissions.into_iter().map(|grant| {
            ResourceGrant::new(Principal::Role(RoleId::new(grant.role_id)), grant.level)
        });
        let grants = user_grants
            .chain(role_grants)
            .collect::<AppResult<Vec<_>>>()
            .map_err(|error| invalid_payload("resource grant", error))?;

        Ok(ResourceSnapshot {
            resource: ResourceRef::new(
                requested.kind,
                ResourceId::new(self.id),
                InitiativeId::new(self.initiative_id),
            ),
            grants,
            tag_ids: self
                .tags
                .into_iter()
                .map(|tag| TagId::new(tag.id))
                .collect::<BTreeSet<_>>(),
        })
    }
}

#[derive(Debug, Serialize)]
pub(super) struct UserGrantBody {
    pub user_id: i64,
    pub level: AccessLevel,
}

#[derive(Debug, Serialize)]
pub(super) struct RoleGrantBody {
    pub role_id: i64,
    pub level: AccessLevel,
}

#[derive(Debug, Serialize)]
pub(super) struct TagBody {
    pub tag_id: i64,
}
