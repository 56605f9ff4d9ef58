use std::collections::{BTreeMap, BTreeSet};

use initiative_access_domain::{InitiativeId, Principal, ResourceGrant, RoleId, TagId};

use crate::{ResourceCommand, ResourceSnapshot};

use super::TagAction;

/// Role ids defined per initiative, used to reject cross-initiative role grants.
pub(crate) type InitiativeRoleIndex = BTreeMap<InitiativeId, BTreeSet<RoleId>>;

/// Commands left to dispatch after skipping no-ops.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct BulkPlan {
    pub commands: Vec<ResourceCommand>,
    pub skipped_duplicate: usize,
    pub skipped_wrong_initiative: usize,
}

fn principal_in_scope(
    principal: Principal,
    initiative_id: InitiativeId,
    roles: &InitiativeRoleIndex,
) -> bool {
    match principal {
        Principal::User(_) => true,
        Principal::Role(role_id) => roles
            .get(&initiative_id)
            .is_some_and(|role_ids| role_ids.contains(&role_id)),
    }
}

pub(crate) fn plan_grants(
    snapshots: &[ResourceSnapshot],
    grants: &[ResourceGrant],
    roles: &InitiativeRoleIndex,
) -> BulkPlan {
    let mut plan = BulkPlan::default();

    for snapshot in snapshots {
        for grant in grants {
            let principal = grant.principal();
            if !principal_in_scope(principal, snapshot.resource.initiative_id, roles) {
                plan.skipped_wrong_initiative += 1;
            } else if snapshot.level_for(principal) == Some(grant.level()) {
                plan.skipped_duplicate += 1;
            } else {
                plan.commands.push(ResourceCommand::PutGrant {
                    resource: snapshot.resource,
                    grant: *grant,
                });
            }
        }
    }

    plan
}

pub(crate) fn plan_revokes(
    snapshots: &[ResourceSnapshot],
    principals: &[Principal],
    roles: &InitiativeRoleIndex,
) -> BulkPlan {
    let mut plan = BulkPlan::default();

    for snapshot in snapshots {
        for principal in principals {
            if !principal_in_scope(*principal, snapshot.resource.initiative_id, roles) {
                plan.skipped_wrong_initiative += 1;
            } else if snapshot.level_for(*principal).is_none() {
                plan.skipped_duplicate += 1;
            } else {
                plan.commands.push(ResourceCommand::DeleteGrant {
                    resource: snapshot.resource,
                    principal: *principal,
                });
            }
        }
    }

    plan
}

pub(crate) fn plan_tags(
    snapshots: &[ResourceSnapshot],
    tag_ids: &[TagId],
    action: TagAction,
) -> BulkPlan {
    let mut plan = BulkPlan::default();

    for snapshot in snapshots {
        for tag_id in tag_ids {
            let tagged = snapshot.tag_ids.contains(tag_id);
            let command = match action {
                TagAction::Add if !tagged => Some(ResourceCommand::AddTag {
                    resource: snapshot.resource,
                    tag_id: *tag_id,
                }),
                TagAction::Remove if tagged => Some(ResourceCommand::RemoveTag {
                    resource: snapshot.resource,
                    tag_id: *tag_id,
                }),
                TagAction::Add | TagAction::Remove => None,
            };

            match command {
                Some(command) => plan.commands.push(command),
                None => plan.skipped_duplicate += 1,
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use initiative_access_domain::{
        AccessLevel, InitiativeId, Principal, ResourceGrant, ResourceId, ResourceKind,
        ResourceRef, RoleId, TagId, UserId,
    };

    use crate::{ResourceCommand, ResourceSnapshot};

    use super::super::TagAction;
    use super::{InitiativeRoleIndex, plan_grants, plan_revokes, plan_tags};

    fn grant(principal: Principal, level: AccessLevel) -> ResourceGrant {
        ResourceGrant::new(principal, level).unwrap_or_else(|_| unreachable!())
    }

    fn snapshot(id: i64, initiative_id: i64, grants: Vec<ResourceGrant>) -> ResourceSnapshot {
        ResourceSnapshot {
            resource: ResourceRef::new(
                ResourceKind::Document,
                ResourceId::new(id),
                InitiativeId::new(initiative_id),
            ),
            grants,
            tag_ids: BTreeSet::from([TagId::new(1)]),
        }
    }

    fn roles() -> InitiativeRoleIndex {
        InitiativeRoleIndex::from([
            (InitiativeId::new(10), BTreeSet::from([RoleId::new(4)])),
            (InitiativeId::new(20), BTreeSet::from([RoleId::new(8)])),
        ])
    }

    #[test]
    fn identical_grants_are_skipped() {
        let existing = grant(Principal::User(UserId::new(7)), AccessLevel::Read);
        let snapshots = vec![snapshot(1, 10, vec![existing]), snapshot(2, 10, vec![existing])];

        let plan = plan_grants(&snapshots, &[existing], &roles());

        assert!(plan.commands.is_empty());
        assert_eq!(plan.skipped_duplicate, 2);
    }

    #[test]
    fn level_changes_are_planned() {
        let existing = grant(Principal::User(UserId::new(7)), AccessLevel::Read);
        let upgrade = grant(Principal::User(UserId::new(7)), AccessLevel::Write);

        let plan = plan_grants(&[snapshot(1, 10, vec![existing])], &[upgrade], &roles());

        assert_eq!(plan.commands.len(), 1);
        assert_eq!(plan.skipped_duplicate, 0);
    }

    #[test]
    fn role_grants_skip_resources_of_other_initiatives() {
        let role_grant = grant(Principal::Role(RoleId::new(4)), AccessLevel::Write);
        let snapshots = vec![snapshot(1, 10, Vec::new()), snapshot(2, 20, Vec::new())];

        let plan = plan_grants(&snapshots, &[role_grant], &roles());

        assert_eq!(plan.commands.len(), 1);
        assert_eq!(plan.skipped_wrong_initiative, 1);
        assert_eq!(plan.commands[0].resource().id, ResourceId::new(1));
    }

    #[test]
    fn revoking_missing_grants_is_a_no_op() {
        let existing = grant(Principal::User(UserId::new(7)), AccessLevel::Read);
        let snapshots = vec![snapshot(1, 10, vec![existing]), snapshot(2, 10, Vec::new())];

        let plan = plan_revokes(&snapshots, &[Principal::User(UserId::new(7))], &roles());

        assert_eq!(
            plan.commands,
            vec![ResourceCommand::DeleteGrant {
                resource: snapshots[0].resource,
                principal: Principal::User(UserId::new(7)),
            }]
        );
        assert_eq!(plan.skipped_duplicate, 1);
    }

    #[test]
    fn tags_already_attached_are_skipped() {
        let snapshots = vec![snapshot(1, 10, Vec::new())];

        let added = plan_tags(&snapshots, &[TagId::new(1), TagId::new(2)], TagAction::Add);
        let removed = plan_tags(&snapshots, &[TagId::new(1), TagId::new(2)], TagAction::Remove);

        assert_eq!(added.commands.len(), 1);
        assert_eq!(added.skipped_duplicate, 1);
        assert_eq!(removed.commands.len(), 1);
        assert_eq!(removed.skipped_duplicate, 1);
    }
}
