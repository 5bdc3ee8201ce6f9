use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use trackstar_application::{AuditRepository, MembershipChange};
use trackstar_core::{AppError, AppResult};
use trackstar_domain::RoleName;

/// Membership audit trail kept in `project_membership_audit`.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn record_membership_change(&self, change: MembershipChange) -> AppResult<()> {
        let MembershipChange {
            actor,
            action,
            project_id,
            member,
            role,
        } = change;

        sqlx::query(
            r#"
            INSERT INTO project_membership_audit
                (id, actor_id, action, project_id, member_id, role_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.as_str())
        .bind(action.as_str())
        .bind(project_id.as_i64())
        .bind(member.as_str())
        .bind(role.as_ref().map(RoleName::as_str))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to record membership change in project {project_id}: {error}"
            ))
        })?;

        Ok(())
    }
}
