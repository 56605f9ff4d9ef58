use initiative_access_domain::{LegacyPermissionFlags, PermissionKey, PermissionSet};

/// Resolves permissions from legacy per-member flags.
///
/// Absent flags default to allowed for view keys and denied for create keys.
/// Passing `None` (the user is not a member) yields the same defaults.
#[must_use]
pub fn resolve_legacy_permissions(flags: Option<&LegacyPermissionFlags>) -> PermissionSet {
    PermissionSet::from_pairs(PermissionKey::all().iter().map(|key| {
        let stored = flags.and_then(|flags| flags.value(*key));
        (*key, stored.unwrap_or(key.is_view()))
    }))
}

#[cfg(test)]
mod tests {
    use initiative_access_domain::{LegacyPermissionFlags, PermissionKey};

    use super::resolve_legacy_permissions;

    #[test]
    fn absent_flags_allow_viewing_and_deny_creating() {
        let resolved = resolve_legacy_permissions(Some(&LegacyPermissionFlags::default()));

        assert!(resolved.get(PermissionKey::ViewDocs));
        assert!(resolved.get(PermissionKey::ViewProjects));
        assert!(resolved.get(PermissionKey::ViewQueues));
        assert!(!resolved.get(PermissionKey::CreateDocs));
        assert!(!resolved.get(PermissionKey::CreateProjects));
        assert!(!resolved.get(PermissionKey::CreateQueues));
    }

    #[test]
    fn non_members_get_the_same_defaults() {
        assert_eq!(
            resolve_legacy_permissions(None),
            resolve_legacy_permissions(Some(&LegacyPermissionFlags::default()))
        );
    }

    #[test]
    fn explicit_flags_override_defaults() {
        let flags = LegacyPermissionFlags {
            can_view_docs: Some(false),
            can_create_projects: Some(true),
            ..LegacyPermissionFlags::default()
        };
        let resolved = resolve_legacy_permissions(Some(&flags));

        assert!(!resolved.get(PermissionKey::ViewDocs));
        assert!(resolved.get(PermissionKey::CreateProjects));
        assert!(resolved.get(PermissionKey::ViewProjects));
        assert!(!resolved.get(PermissionKey::CreateDocs));
    }
}
