//! Application services and ports.

#![forbid(unsafe_code)]

mod access_decision;
mod access_ports;
mod access_service;
mod bulk_access_service;
mod grant_resolution;
mod permission_resolution;

#[cfg(test)]
mod fixtures;

pub use access_decision::{AccessState, InitiativeAccess, PermissionOrigin, ResourceAccess};
pub use access_ports::{
    AccessDataCache, InitiativeAccessData, InitiativeDirectory, ResourceCommand,
    ResourceCommandGateway, ResourceSnapshot,
};
pub use access_service::{
    AccessService, AccessServiceConfig, PermissionReport, PermissionSource,
};
pub use bulk_access_service::{
    BulkAccessService, BulkFailure, BulkGrantRequest, BulkOutcome, BulkReport,
    BulkRevokeRequest, BulkTagRequest, Confirmation, TagAction,
};
pub use grant_resolution::{GrantResolutionInput, resolve_access_level};
pub use permission_resolution::{
    PermissionSubject, resolve_initiative_permissions, resolve_legacy_permissions,
};
