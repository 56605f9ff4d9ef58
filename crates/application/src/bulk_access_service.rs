//! Applies grant and tag changes across many resources at once.

mod dispatch;
mod plan;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use initiative_access_core::{AppError, AppResult};
use initiative_access_domain::{
    AccessLevel, InitiativeId, Principal, ResourceGrant, ResourceKind, ResourceRef, RoleId,
    TagId,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    AccessDataCache, InitiativeDirectory, ResourceCommand, ResourceCommandGateway,
    ResourceSnapshot,
};

use dispatch::fan_out;
use plan::{BulkPlan, InitiativeRoleIndex, plan_grants, plan_revokes, plan_tags};

/// Whether the caller has acknowledged a destructive bulk operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Confirmation {
    /// Caller confirmed the operation.
    Confirmed,
    /// Caller has not confirmed yet.
    #[default]
    Pending,
}

/// Direction of a bulk tag change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAction {
    /// Attach tags.
    Add,
    /// Detach tags.
    Remove,
}

impl TagAction {
    /// Returns the stable action name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

/// Grants one level to every principal on every resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkGrantRequest {
    /// Target resources.
    pub resources: Vec<ResourceRef>,
    /// Principals receiving access.
    pub principals: Vec<Principal>,
    /// Level to grant.
    pub level: AccessLevel,
}

/// Removes the grants held by every principal on every resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRevokeRequest {
    /// Target resources.
    pub resources: Vec<ResourceRef>,
    /// Principals losing access.
    pub principals: Vec<Principal>,
    /// Revocation must be confirmed.
    pub confirmation: Confirmation,
}

/// Attaches or detaches tags on every resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkTagRequest {
    /// Target resources.
    pub resources: Vec<ResourceRef>,
    /// Tags to change.
    pub tag_ids: Vec<TagId>,
    /// Attach or detach.
    pub action: TagAction,
    /// Detaching must be confirmed.
    pub confirmation: Confirmation,
}

/// Counters for one bulk operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkReport {
    /// Commands that succeeded.
    pub affected: usize,
    /// Pairs skipped because the change was already in place.
    pub skipped_duplicate: usize,
    /// Role pairs skipped because the role belongs to another initiative.
    pub skipped_wrong_initiative: usize,
    /// Commands or resource lookups that failed.
    pub failed: usize,
}

impl BulkReport {
    /// Returns whether nothing was sent and nothing failed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.affected == 0 && self.failed == 0
    }
}

impl fmt::Display for BulkReport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_noop() {
            return write!(
                formatter,
                "no changes ({} already applied, {} outside initiative)",
                self.skipped_duplicate, self.skipped_wrong_initiative
            );
        }

        write!(
            formatter,
            "{} applied, {} already applied, {} outside initiative, {} failed",
            self.affected, self.skipped_duplicate, self.skipped_wrong_initiative, self.failed
        )
    }
}

/// One failed resource lookup or command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    /// Resource the failure relates to.
    pub resource: ResourceRef,
    /// Command that failed, `None` when the resource could not be loaded.
    pub command: Option<ResourceCommand>,
    /// Failure cause.
    pub error: AppError,
}

/// Result of one bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOutcome {
    /// Correlation id used in logs.
    pub operation_id: Uuid,
    /// Aggregated counters.
    pub report: BulkReport,
    /// Individual failures.
    pub failures: Vec<BulkFailure>,
}

/// Application service for bulk grant and tag changes.
#[derive(Clone)]
pub struct BulkAccessService {
    directory: Arc<dyn InitiativeDirectory>,
    gateway: Arc<dyn ResourceCommandGateway>,
    cache: Arc<dyn AccessDataCache>,
}

struct LoadedResources {
    snapshots: Vec<ResourceSnapshot>,
    roles: InitiativeRoleIndex,
    failures: Vec<BulkFailure>,
}

impl BulkAccessService {
    /// Creates a new bulk access service.
    #[must_use]
    pub fn new(
        directory: Arc<dyn InitiativeDirectory>,
        gateway: Arc<dyn ResourceCommandGateway>,
        cache: Arc<dyn AccessDataCache>,
    ) -> Self {
        Self {
            directory,
            gateway,
            cache,
        }
    }

    /// Grants a level to principals on many resources.
    pub async fn grant(&self, request: BulkGrantRequest) -> AppResult<BulkOutcome> {
        let grants = unique(request.principals)
            .into_iter()
            .map(|principal| ResourceGrant::new(principal, request.level))
            .collect::<AppResult<Vec<_>>>()?;
        if grants.is_empty() {
            return Err(AppError::Validation(
                "bulk grant requires at least one principal".to_owned(),
            ));
        }

        let needs_roles = grants
            .iter()
            .any(|grant| matches!(grant.principal(), Principal::Role(_)));
        let loaded = self.load(request.resources, needs_roles).await;
        let plan = plan_grants(&loaded.snapshots, &grants, &loaded.roles);

        Ok(self.apply("grant", plan, loaded.failures).await)
    }

    /// Revokes principals' grants on many resources.
    pub async fn revoke(&self, request: BulkRevokeRequest) -> AppResult<BulkOutcome> {
        require_confirmation(request.confirmation, "bulk revoke")?;
        let principals = unique(request.principals);
        if principals.is_empty() {
            return Err(AppError::Validation(
                "bulk revoke requires at least one principal".to_owned(),
            ));
        }

        let needs_roles = principals
            .iter()
            .any(|principal| matches!(principal, Principal::Role(_)));
        let loaded = self.load(request.resources, needs_roles).await;
        let plan = plan_revokes(&loaded.snapshots, &principals, &loaded.roles);

        Ok(self.apply("revoke", plan, loaded.failures).await)
    }

    /// Attaches or detaches tags on many resources.
    pub async fn tag(&self, request: BulkTagRequest) -> AppResult<BulkOutcome> {
        if request.action == TagAction::Remove {
            require_confirmation(request.confirmation, "bulk tag removal")?;
        }
        let tag_ids = unique(request.tag_ids);
        if tag_ids.is_empty() {
            return Err(AppError::Validation(
                "bulk tag change requires at least one tag".to_owned(),
            ));
        }

        let loaded = self.load(request.resources, false).await;
        let plan = plan_tags(&loaded.snapshots, &tag_ids, request.action);
        let operation = match request.action {
            TagAction::Add => "tag_add",
            TagAction::Remove => "tag_remove",
        };

        Ok(self.apply(operation, plan, loaded.failures).await)
    }

    async fn load(&self, resources: Vec<ResourceRef>, needs_roles: bool) -> LoadedResources {
        let directory = self.directory.clone();
        let fetched = fan_out(unique(resources), move |resource| {
            let directory = directory.clone();
            async move { directory.fetch_resource(resource).await }
        })
        .await;

        let mut snapshots = Vec::with_capacity(fetched.len());
        let mut failures = Vec::new();
        for (resource, result) in fetched {
            match result {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(error) => failures.push(BulkFailure {
                    resource,
                    command: None,
                    error,
                }),
            }
        }

        let mut roles = InitiativeRoleIndex::new();
        if needs_roles {
            let initiative_ids: Vec<InitiativeId> = snapshots
                .iter()
                .map(|snapshot| snapshot.resource.initiative_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let directory = self.directory.clone();
            let listed = fan_out(initiative_ids, move |initiative_id| {
                let directory = directory.clone();
                async move { directory.list_roles(initiative_id).await }
            })
            .await;

            let mut unavailable = BTreeMap::new();
            for (initiative_id, result) in listed {
                match result {
                    Ok(defined) => {
                        let role_ids: BTreeSet<RoleId> =
                            defined.iter().map(|role| role.id()).collect();
                        roles.insert(initiative_id, role_ids);
                    }
                    Err(error) => {
                        unavailable.insert(initiative_id, error);
                    }
                }
            }

            snapshots.retain(|snapshot| {
                match unavailable.get(&snapshot.resource.initiative_id) {
                    Some(error) => {
                        failures.push(BulkFailure {
                            resource: snapshot.resource,
                            command: None,
                            error: error.clone(),
                        });
                        false
                    }
                    None => true,
                }
            });
        }

        LoadedResources {
            snapshots,
            roles,
            failures,
        }
    }

    async fn apply(
        &self,
        operation: &'static str,
        plan: BulkPlan,
        mut failures: Vec<BulkFailure>,
    ) -> BulkOutcome {
        let operation_id = Uuid::new_v4();
        let kinds: BTreeSet<ResourceKind> = plan
            .commands
            .iter()
            .map(|command| command.resource().kind)
            .collect();

        // Detached so an abandoned caller cannot cancel commands already sent.
        let gateway = self.gateway.clone();
        let commands = plan.commands;
        let sent = commands.clone();
        let results = tokio::spawn(async move {
            fan_out(commands, move |command| {
                let gateway = gateway.clone();
                async move { gateway.execute(command).await }
            })
            .await
        })
        .await;

        let mut report = BulkReport {
            skipped_duplicate: plan.skipped_duplicate,
            skipped_wrong_initiative: plan.skipped_wrong_initiative,
            ..BulkReport::default()
        };
        match results {
            Ok(results) => {
                for (command, result) in results {
                    match result {
                        Ok(()) => report.affected += 1,
                        Err(error) => failures.push(BulkFailure {
                            resource: command.resource(),
                            command: Some(command),
                            error,
                        }),
                    }
                }
            }
            Err(error) => {
                let error = AppError::Internal(format!("bulk dispatch terminated: {error}"));
                failures.extend(sent.into_iter().map(|command| BulkFailure {
                    resource: command.resource(),
                    command: Some(command),
                    error: error.clone(),
                }));
            }
        }
        report.failed = failures.len();

        if !kinds.is_empty()
            && let Err(error) = self.cache.invalidate_resource_kinds(&kinds).await
        {
            warn!(
                operation_id = %operation_id,
                error = %error,
                "failed to invalidate cached resources"
            );
        }

        for failure in &failures {
            warn!(
                operation_id = %operation_id,
                operation,
                resource = %failure.resource,
                error = %failure.error,
                "bulk step failed"
            );
        }
        info!(
            operation_id = %operation_id,
            operation,
            affected = report.affected,
            skipped_duplicate = report.skipped_duplicate,
            skipped_wrong_initiative = report.skipped_wrong_initiative,
            failed = report.failed,
            "bulk access operation finished"
        );

        BulkOutcome {
            operation_id,
            report,
            failures,
        }
    }
}

fn require_confirmation(confirmation: Confirmation, operation: &str) -> AppResult<()> {
    match confirmation {
        Confirmation::Confirmed => Ok(()),
        Confirmation::Pending => Err(AppError::Validation(format!(
            "{operation} is destructive and must be confirmed"
        ))),
    }
}

fn unique<T: Ord + Copy>(items: Vec<T>) -> Vec<T> {
    let mut seen = BTreeSet::new();
    items.into_iter().filter(|item| seen.insert(*item)).collect()
}
