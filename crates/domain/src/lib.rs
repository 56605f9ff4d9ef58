//! Domain entities and invariants for initiative access control.

#![forbid(unsafe_code)]

mod grant;
mod guild;
mod ids;
mod initiative;
mod permission;
mod user;

pub use grant::{AccessLevel, Principal, ResourceGrant, ResourceKind, ResourceRef};
pub use guild::{GuildMembership, GuildRole};
pub use ids::{InitiativeId, ResourceId, RoleId, TagId, UserId};
pub use initiative::{
    Initiative, InitiativeMember, InitiativeRole, LegacyPermissionFlags, MemberRoleTag,
};
pub use permission::{EntityKind, PermissionKey, PermissionSet};
pub use user::{EmailAddress, User};
