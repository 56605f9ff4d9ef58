use std::process::ExitCode;

use initiative_access_application::{
    AccessService, AccessState, BulkAccessService, BulkGrantRequest, BulkOutcome,
    BulkRevokeRequest, BulkTagRequest, Confirmation, TagAction,
};
use initiative_access_core::{AppError, AppResult, UserIdentity};
use initiative_access_domain::{
    InitiativeId, PermissionKey, PermissionSet, Principal, ResourceId, ResourceRef, RoleId,
    TagId, UserId,
};

use crate::{Command, PrincipalSelection, ResourceSelection, TagActionArg};

pub struct CommandContext {
    pub access_service: AccessService,
    pub bulk_service: BulkAccessService,
    pub identity: UserIdentity,
}

pub async fn run(context: &CommandContext, command: Command) -> AppResult<ExitCode> {
    match command {
        Command::Permissions { initiative } => {
            print_permissions(context, InitiativeId::new(initiative)).await
        }
        Command::Access {
            kind,
            resource,
            initiative,
        } => {
            let resource = ResourceRef::new(
                kind,
                ResourceId::new(resource),
                InitiativeId::new(initiative),
            );
            let state = context
                .access_service
                .resource_access(&context.identity, resource)
                .await;

            match state {
                AccessState::Ready(access) => {
                    println!("{}: {}", access.resource(), access.level());
                    Ok(ExitCode::SUCCESS)
                }
                AccessState::Loading => Err(AppError::Unavailable(format!(
                    "access to '{resource}' is still loading"
                ))),
                AccessState::Failed(reason) => Err(AppError::Unavailable(reason)),
            }
        }
        Command::CanCreate { kind, initiative } => {
            let initiative_id = InitiativeId::new(initiative);
            match context
                .access_service
                .require_create(&context.identity, initiative_id, kind)
                .await
            {
                Ok(()) => {
                    println!("allowed: {}", kind.create_key());
                    Ok(ExitCode::SUCCESS)
                }
                Err(AppError::Forbidden(message)) => {
                    println!("denied: {message}");
                    Ok(ExitCode::FAILURE)
                }
                Err(error) => Err(error),
            }
        }
        Command::BulkGrant {
            resources,
            principals,
            level,
        } => {
            let outcome = context
                .bulk_service
                .grant(BulkGrantRequest {
                    resources: resource_refs(&resources),
                    principals: principal_list(&principals)?,
                    level,
                })
                .await?;
            Ok(print_outcome(&outcome))
        }
        Command::BulkRevoke {
            resources,
            principals,
            yes,
        } => {
            let outcome = context
                .bulk_service
                .revoke(BulkRevokeRequest {
                    resources: resource_refs(&resources),
                    principals: principal_list(&principals)?,
                    confirmation: confirmation(yes),
                })
                .await?;
            Ok(print_outcome(&outcome))
        }
        Command::BulkTag {
            action,
            resources,
            tags,
            yes,
        } => {
            let action = match action {
                TagActionArg::Add => TagAction::Add,
                TagActionArg::Remove => TagAction::Remove,
            };
            let outcome = context
                .bulk_service
                .tag(BulkTagRequest {
                    resources: resource_refs(&resources),
                    tag_ids: tags.into_iter().map(TagId::new).collect(),
                    action,
                    confirmation: confirmation(yes),
                })
                .await?;
            Ok(print_outcome(&outcome))
        }
    }
}

async fn print_permissions(
    context: &CommandContext,
    initiative_id: InitiativeId,
) -> AppResult<ExitCode> {
    let report = context
        .access_service
        .permission_report(&context.identity, initiative_id)
        .await?;

    println!(
        "initiative {initiative_id} ({} permissions)",
        report.access.origin().as_str()
    );
    for key in PermissionKey::all() {
        println!(
            "  {:<16} effective={:<5} local={:<5} server={}",
            key.as_str(),
            report.access.permissions().get(*key),
            report.local.get(*key),
            server_value(report.server.as_ref(), *key),
        );
    }

    if !report.drift.is_empty() {
        let keys: Vec<&str> = report.drift.iter().map(PermissionKey::as_str).collect();
        println!("drift: {}", keys.join(", "));
    }

    Ok(ExitCode::SUCCESS)
}

fn server_value(server: Option<&PermissionSet>, key: PermissionKey) -> &'static str {
    match server.map(|permissions| permissions.get(key)) {
        Some(true) => "true",
        Some(false) => "false",
        None => "-",
    }
}

fn resource_refs(selection: &ResourceSelection) -> Vec<ResourceRef> {
    selection
        .resources
        .iter()
        .map(|id| {
            ResourceRef::new(
                selection.kind,
                ResourceId::new(*id),
                InitiativeId::new(selection.initiative),
            )
        })
        .collect()
}

fn principal_list(selection: &PrincipalSelection) -> AppResult<Vec<Principal>> {
    let principals: Vec<Principal> = selection
        .users
        .iter()
        .map(|id| Principal::User(UserId::new(*id)))
        .chain(
            selection
                .roles
                .iter()
                .map(|id| Principal::Role(RoleId::new(*id))),
        )
        .collect();

    if principals.is_empty() {
        return Err(AppError::Validation(
            "at least one --user or --role is required".to_owned(),
        ));
    }
    Ok(principals)
}

fn confirmation(confirmed: bool) -> Confirmation {
    if confirmed {
        Confirmation::Confirmed
    } else {
        Confirmation::Pending
    }
}

fn print_outcome(outcome: &BulkOutcome) -> ExitCode {
    println!("{} (operation {})", outcome.report, outcome.operation_id);
    for failure in &outcome.failures {
        println!("  failed {}: {}", failure.resource, failure.error);
    }

    if outcome.report.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
