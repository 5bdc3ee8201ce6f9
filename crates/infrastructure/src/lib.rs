//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_repository;
mod in_memory_authorization_repository;
mod postgres_assignment_repository;
mod postgres_audit_repository;
mod postgres_project_membership_repository;
mod postgres_role_repository;

pub use in_memory_audit_repository::InMemoryAuditRepository;
pub use in_memory_authorization_repository::InMemoryAuthorizationRepository;
pub use postgres_assignment_repository::PostgresAssignmentRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_project_membership_repository::PostgresProjectMembershipRepository;
pub use postgres_role_repository::PostgresRoleRepository;

/// Embedded schema migrations for the PostgreSQL adapters.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
