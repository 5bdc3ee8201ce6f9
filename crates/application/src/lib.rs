//! Application services and ports.

#![forbid(unsafe_code)]

mod access_checker;
mod assignment_service;
mod authorization_ports;
mod predicate_registry;
mod project_membership_service;
mod role_registry_service;

#[cfg(test)]
mod test_support;

pub use access_checker::AccessChecker;
pub use assignment_service::AssignmentService;
pub use authorization_ports::{
    AssignmentRepository, AuditRepository, MembershipChange, ProjectMembershipRepository,
    RoleRepository,
};
pub use predicate_registry::{PredicateEvaluator, PredicateInput, PredicateRegistry};
pub use project_membership_service::ProjectMembershipService;
pub use role_registry_service::RoleRegistryService;
