//! Builders shared by the unit tests of this crate.

use initiative_access_core::{GuildId, NonEmptyString, PlatformRole};
use initiative_access_domain::{
    EmailAddress, GuildMembership, GuildRole, Initiative, InitiativeId, InitiativeMember,
    InitiativeRole, LegacyPermissionFlags, MemberRoleTag, PermissionKey, PermissionSet, RoleId,
    User, UserId,
};

pub const GUILD: i64 = 1;

pub fn text(value: &str) -> NonEmptyString {
    NonEmptyString::new(value).unwrap_or_else(|_| unreachable!())
}

pub fn user(user_id: i64) -> User {
    let email = EmailAddress::new(format!("user{user_id}@example.com"))
        .unwrap_or_else(|_| unreachable!());
    User::new(
        UserId::new(user_id),
        email,
        text("Member"),
        PlatformRole::Member,
    )
}

pub fn role(
    role_id: i64,
    initiative_id: i64,
    name: &str,
    keys: &[PermissionKey],
) -> InitiativeRole {
    InitiativeRole::new(
        RoleId::new(role_id),
        InitiativeId::new(initiative_id),
        text(name),
        text(name),
        name == "project_manager",
        PermissionSet::from_pairs(keys.iter().map(|key| (*key, true))),
    )
}

pub fn member(user_id: i64, role_ids: &[i64]) -> InitiativeMember {
    InitiativeMember::new(
        user(user_id),
        role_ids.iter().copied().map(RoleId::new).collect(),
        MemberRoleTag::Member,
        LegacyPermissionFlags::default(),
    )
}

pub fn member_with_flags(
    user_id: i64,
    role_ids: &[i64],
    flags: LegacyPermissionFlags,
) -> InitiativeMember {
    InitiativeMember::new(
        user(user_id),
        role_ids.iter().copied().map(RoleId::new).collect(),
        MemberRoleTag::Member,
        flags,
    )
}

pub fn manager(user_id: i64) -> InitiativeMember {
    InitiativeMember::new(
        user(user_id),
        Vec::new(),
        MemberRoleTag::ProjectManager,
        LegacyPermissionFlags::default(),
    )
}

pub fn initiative(
    initiative_id: i64,
    members: Vec<InitiativeMember>,
    roles: Vec<InitiativeRole>,
) -> Initiative {
    Initiative::new(
        InitiativeId::new(initiative_id),
        GuildId::new(GUILD),
        text("Initiative"),
        members,
    )
    .and_then(|initiative| initiative.with_roles(roles))
    .unwrap_or_else(|_| unreachable!())
}

pub fn guild_membership(user_id: i64, role: GuildRole) -> GuildMembership {
    GuildMembership {
        guild_id: GuildId::new(GUILD),
        user_id: UserId::new(user_id),
        role,
    }
}
