use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use trackstar_application::ProjectMembershipRepository;
use trackstar_core::{AppError, AppResult, ProjectId, UserId};
use trackstar_domain::{ProjectMember, RoleName};

/// PostgreSQL-backed `(project, user, role)` rows.
#[derive(Clone)]
pub struct PostgresProjectMembershipRepository {
    pool: PgPool,
}

impl PostgresProjectMembershipRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProjectMemberRow {
    user_id: String,
    role: String,
}

#[async_trait]
impl ProjectMembershipRepository for PostgresProjectMembershipRepository {
    async fn add_member(&self, project_id: ProjectId, member: ProjectMember) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO project_user_assignments (project_id, user_id, role)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(project_id.as_i64())
        .bind(member.user_id.as_str())
        .bind(member.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| map_member_error(error, project_id, &member))?;

        Ok(())
    }

    async fn remove_membership(
        &self,
        project_id: ProjectId,
        member: &ProjectMember,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM project_user_assignments
            WHERE project_id = $1 AND user_id = $2 AND role = $3
            "#,
        )
        .bind(project_id.as_i64())
        .bind(member.user_id.as_str())
        .bind(member.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to remove project membership row: {error}"))
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_member(&self, project_id: ProjectId, user_id: &UserId) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM project_user_assignments
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id.as_i64())
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove project member: {error}")))?;

        Ok(result.rows_affected())
    }

    async fn list_members(&self, project_id: ProjectId) -> AppResult<Vec<ProjectMember>> {
        let rows = sqlx::query_as::<_, ProjectMemberRow>(
            r#"
            SELECT user_id, role
            FROM project_user_assignments
            WHERE project_id = $1
            ORDER BY user_id, role
            "#,
        )
        .bind(project_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list project members: {error}")))?;

        rows.into_iter()
            .map(|row| {
                Ok(ProjectMember {
                    user_id: UserId::new(row.user_id).map_err(|error| {
                        AppError::Internal(format!("stored member user id is invalid: {error}"))
                    })?,
                    role: RoleName::new(row.role).map_err(|error| {
                        AppError::Internal(format!("stored member role is invalid: {error}"))
                    })?,
                })
            })
            .collect()
    }
}

fn map_member_error(error: sqlx::Error, project_id: ProjectId, member: &ProjectMember) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        match database_error.code().as_deref() {
            Some("23503") => return AppError::UnknownRole(member.role.to_string()),
            Some("23505") => {
                return AppError::Conflict(format!(
                    "user '{}' already holds role '{}' in project '{project_id}'",
                    member.user_id, member.role
                ));
            }
            _ => {}
        }
    }

    AppError::Internal(format!("failed to add project member: {error}"))
}
