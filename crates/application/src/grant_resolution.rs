//! Resource-level access aggregation.

use initiative_access_domain::{AccessLevel, Principal, ResourceGrant, RoleId, UserId};

/// Inputs for resolving one user's access to one resource.
#[derive(Debug, Clone, Copy)]
pub struct GrantResolutionInput<'a> {
    /// Every grant stored on the resource.
    pub grants: &'a [ResourceGrant],
    /// User being evaluated.
    pub user_id: UserId,
    /// Roles the user holds in the resource's initiative.
    pub held_role_ids: &'a [RoleId],
    /// Guild admin or initiative manager.
    pub has_override: bool,
}

/// Resolves the effective access level of a user on a resource.
///
/// The override yields `Owner`. Otherwise the highest level among the direct
/// user grant and every role grant the user holds wins; no match is `None`.
#[must_use]
pub fn resolve_access_level(input: GrantResolutionInput<'_>) -> AccessLevel {
    if input.has_override {
        return AccessLevel::Owner;
    }

    input
        .grants
        .iter()
        .filter(|grant| match grant.principal() {
            Principal::User(user_id) => user_id == input.user_id,
            Principal::Role(role_id) => input.held_role_ids.contains(&role_id),
        })
        .map(ResourceGrant::level)
        .max()
        .unwrap_or(AccessLevel::None)
}
