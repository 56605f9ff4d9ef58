//! Operator CLI for initiative permission checks and bulk access changes.

#![forbid(unsafe_code)]

mod cli_config;
mod commands;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use initiative_access_application::{AccessService, BulkAccessService};
use initiative_access_core::AppError;
use initiative_access_domain::{AccessLevel, EntityKind, ResourceKind};
use initiative_access_infrastructure::{HttpInitiativeApi, InMemoryAccessDataCache};
use tracing::info;

use crate::cli_config::{CliConfig, init_tracing};
use crate::commands::CommandContext;

/// Inspect and change initiative access.
#[derive(Parser, Debug)]
#[command(name = "initiative-access")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the caller's resolved, server and drifting permissions
    Permissions {
        /// Initiative id
        initiative: i64,
    },

    /// Print the caller's access level on one resource
    Access {
        /// Resource kind (document, project, queue)
        kind: ResourceKind,
        /// Resource id
        resource: i64,
        /// Initiative owning the resource
        #[arg(long)]
        initiative: i64,
    },

    /// Check whether the caller may create entities of a kind
    CanCreate {
        /// Entity kind (docs, projects, queues)
        kind: EntityKind,
        /// Initiative id
        #[arg(long)]
        initiative: i64,
    },

    /// Grant a level to users and roles on many resources
    BulkGrant {
        #[command(flatten)]
        resources: ResourceSelection,
        #[command(flatten)]
        principals: PrincipalSelection,
        /// Level to grant (read, write, owner)
        #[arg(long)]
        level: AccessLevel,
    },

    /// Revoke the grants of users and roles on many resources
    BulkRevoke {
        #[command(flatten)]
        resources: ResourceSelection,
        #[command(flatten)]
        principals: PrincipalSelection,
        /// Confirm the revocation
        #[arg(long)]
        yes: bool,
    },

    /// Attach or detach tags on many resources
    BulkTag {
        /// Whether tags are attached or detached
        action: TagActionArg,
        #[command(flatten)]
        resources: ResourceSelection,
        /// Tag id, repeatable
        #[arg(long = "tag", required = true)]
        tags: Vec<i64>,
        /// Confirm a detach
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
struct ResourceSelection {
    /// Resource kind (document, project, queue)
    #[arg(long)]
    kind: ResourceKind,
    /// Initiative owning the resources
    #[arg(long)]
    initiative: i64,
    /// Resource id, repeatable
    #[arg(long = "resource", required = true)]
    resources: Vec<i64>,
}

#[derive(Args, Debug)]
struct PrincipalSelection {
    /// User id, repeatable
    #[arg(long = "user")]
    users: Vec<i64>,
    /// Role id, repeatable
    #[arg(long = "role")]
    roles: Vec<i64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TagActionArg {
    Add,
    Remove,
}

#[tokio::main]
async fn main() -> Result<ExitCode, AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = CliConfig::load()?;
    let api = Arc::new(HttpInitiativeApi::new(config.api.clone())?);
    let cache = Arc::new(InMemoryAccessDataCache::new());
    let identity = api.fetch_current_user(config.guild_id).await?;

    info!(
        user_id = identity.user_id(),
        guild_id = %config.guild_id,
        permission_source = config.permission_source.as_str(),
        "authenticated against initiative API"
    );

    let context = CommandContext {
        access_service: AccessService::new(
            api.clone(),
            cache.clone(),
            config.access_service_config(),
        ),
        bulk_service: BulkAccessService::new(api.clone(), api, cache),
        identity,
    };

    commands::run(&context, cli.command).await
}
