//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod assignment;
mod catalogue;
mod context;
mod hierarchy;
mod predicate;
mod role;
mod security;

pub use assignment::{Assignment, AssignmentData};
pub use catalogue::{
    ADMIN_ROLE, CatalogueRole, MEMBER_ROLE, OWNER_ROLE, READER_ROLE, default_role_catalogue,
};
pub use context::{AccessContext, ProjectContext, ProjectMember};
pub use hierarchy::RoleHierarchy;
pub use predicate::{Predicate, PredicateBlob};
pub use role::{ROLE_NAME_MAX_LENGTH, RoleDefinition, RoleName};
pub use security::AuditAction;
