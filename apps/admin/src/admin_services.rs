use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::info;
use trackstar_application::{
    AccessChecker, AssignmentRepository, AssignmentService, AuditRepository, PredicateRegistry,
    ProjectMembershipRepository, ProjectMembershipService, RoleRegistryService, RoleRepository,
};
use trackstar_core::{AppError, AppResult};
use trackstar_infrastructure::{
    InMemoryAuditRepository, InMemoryAuthorizationRepository, MIGRATOR,
    PostgresAssignmentRepository, PostgresAuditRepository, PostgresProjectMembershipRepository,
    PostgresRoleRepository,
};

use crate::admin_config::{AdminConfig, StorageBackend};

/// Services wired over one storage backend.
#[derive(Clone)]
pub struct AdminServices {
    pub role_registry: RoleRegistryService,
    pub assignments: AssignmentService,
    pub access: AccessChecker,
    pub memberships: ProjectMembershipService,
}

impl AdminServices {
    /// Connects the configured backend, applying migrations for Postgres.
    pub async fn connect(config: &AdminConfig) -> AppResult<Self> {
        match config.storage {
            StorageBackend::Memory => {
                info!("using in-memory authorization storage");
                Ok(Self::in_memory())
            }
            StorageBackend::Postgres => {
                let database_url = config.database_url.as_deref().ok_or_else(|| {
                    AppError::Validation("DATABASE_URL is required".to_owned())
                })?;

                let pool = PgPoolOptions::new()
                    .max_connections(config.database_max_connections)
                    .connect(database_url)
                    .await
                    .map_err(|error| {
                        AppError::Internal(format!("failed to connect to database: {error}"))
                    })?;

                MIGRATOR.run(&pool).await.map_err(|error| {
                    AppError::Internal(format!("failed to run migrations: {error}"))
                })?;

                Ok(Self::assemble(
                    Arc::new(PostgresRoleRepository::new(pool.clone())),
                    Arc::new(PostgresAssignmentRepository::new(pool.clone())),
                    Arc::new(PostgresProjectMembershipRepository::new(pool.clone())),
                    Arc::new(PostgresAuditRepository::new(pool)),
                ))
            }
        }
    }

    pub fn in_memory() -> Self {
        let authorization = Arc::new(InMemoryAuthorizationRepository::new());
        Self::assemble(
            authorization.clone(),
            authorization.clone(),
            authorization,
            Arc::new(InMemoryAuditRepository::new()),
        )
    }

    fn assemble(
        roles: Arc<dyn RoleRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        members: Arc<dyn ProjectMembershipRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        let predicates = Arc::new(PredicateRegistry::new());
        let access = AccessChecker::new(roles.clone(), assignments.clone(), predicates.clone());
        let assignment_service = AssignmentService::new(assignments, predicates);

        Self {
            role_registry: RoleRegistryService::new(roles.clone()),
            assignments: assignment_service.clone(),
            access: access.clone(),
            memberships: ProjectMembershipService::new(
                roles,
                members,
                audit_repository,
                assignment_service,
                access,
            ),
        }
    }
}
