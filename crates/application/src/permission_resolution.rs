//! Initiative-level permission resolution.
//!
//! Combines the guild admin override, role definitions and legacy per-member
//! flags into one [`PermissionSet`]. Resolution is pure and never fails:
//! missing or stale inputs degrade to the legacy defaults.

mod legacy;

use initiative_access_domain::{GuildMembership, Initiative, PermissionSet, UserId};

pub use legacy::resolve_legacy_permissions;

/// Inputs describing whose permissions are resolved, and where.
#[derive(Debug, Clone, Copy)]
pub struct PermissionSubject<'a> {
    /// Initiative with role definitions attached.
    pub initiative: &'a Initiative,
    /// User being evaluated.
    pub user_id: UserId,
    /// The user's guild membership, if known.
    pub guild_membership: Option<&'a GuildMembership>,
}

impl PermissionSubject<'_> {
    /// Returns whether the subject is an admin of the guild owning the initiative.
    #[must_use]
    pub fn is_guild_admin(&self) -> bool {
        self.guild_membership.is_some_and(|membership| {
            membership.is_admin()
                && membership.user_id == self.user_id
                && membership.guild_id == self.initiative.guild_id()
        })
    }
}

/// Resolves the effective initiative permission set of a user.
///
/// Guild admins short-circuit to every key. Otherwise the flags of every role
/// the member holds are unioned; when no referenced role still exists, or the
/// user is not a member, the legacy flags (or their defaults) apply.
#[must_use]
pub fn resolve_initiative_permissions(subject: PermissionSubject<'_>) -> PermissionSet {
    if subject.is_guild_admin() {
        return PermissionSet::all_granted();
    }

    let Some(member) = subject.initiative.member(subject.user_id) else {
        return resolve_legacy_permissions(None);
    };

    let held_roles = subject.initiative.held_roles(member);
    if held_roles.is_empty() {
        return resolve_legacy_permissions(Some(member.legacy_flags()));
    }

    held_roles
        .iter()
        .fold(PermissionSet::empty(), |resolved, role| {
            resolved.union(role.permissions())
        })
}
