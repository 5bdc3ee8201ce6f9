mod assignments;
mod audit;
mod projects;
mod roles;

pub use assignments::AssignmentRepository;
pub use audit::{AuditRepository, MembershipChange};
pub use projects::ProjectMembershipRepository;
pub use roles::RoleRepository;
