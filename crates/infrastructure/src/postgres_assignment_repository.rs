use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use trackstar_application::AssignmentRepository;
use trackstar_core::{AppError, AppResult, UserId};
use trackstar_domain::{Assignment, AssignmentData, PredicateBlob, RoleName};

/// PostgreSQL-backed assignment store.
#[derive(Clone)]
pub struct PostgresAssignmentRepository {
    pool: PgPool,
}

impl PostgresAssignmentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    user_id: String,
    role_name: String,
    predicate: Option<String>,
    data: String,
    assigned_at: DateTime<Utc>,
}

impl AssignmentRow {
    fn into_assignment(self) -> AppResult<Assignment> {
        let user_id = UserId::new(self.user_id).map_err(|error| {
            AppError::Internal(format!("stored assignment user id is invalid: {error}"))
        })?;
        let role_name = RoleName::new(self.role_name).map_err(|error| {
            AppError::Internal(format!("stored assignment role is invalid: {error}"))
        })?;
        let data = serde_json::from_str::<AssignmentData>(&self.data).map_err(|error| {
            AppError::Internal(format!("stored assignment data is invalid: {error}"))
        })?;

        Ok(Assignment::restore(
            user_id,
            role_name,
            self.predicate.as_deref().map(PredicateBlob::from_stored),
            data,
            self.assigned_at,
        ))
    }
}

#[async_trait]
impl AssignmentRepository for PostgresAssignmentRepository {
    async fn assign(&self, assignment: Assignment) -> AppResult<bool> {
        let data = serde_json::to_string(assignment.data()).map_err(|error| {
            AppError::Internal(format!("failed to encode assignment data: {error}"))
        })?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO authz_assignments (user_id, role_name, predicate, data, assigned_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, role_name) DO NOTHING
            "#,
        )
        .bind(assignment.user_id().as_str())
        .bind(assignment.role_name().as_str())
        .bind(assignment.predicate().map(PredicateBlob::to_stored))
        .bind(data)
        .bind(assignment.assigned_at())
        .execute(&self.pool)
        .await
        .map_err(|error| map_assignment_error(error, &assignment))?;

        if inserted.rows_affected() > 0 {
            return Ok(true);
        }

        let existing = self
            .find_assignment(assignment.user_id(), assignment.role_name())
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "assignment of role '{}' to user '{}' changed concurrently",
                    assignment.role_name(),
                    assignment.user_id()
                ))
            })?;
        existing.check_reassignment(assignment.predicate())?;

        Ok(false)
    }

    async fn unassign(&self, user_id: &UserId, role_name: &RoleName) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM authz_assignments
            WHERE user_id = $1 AND role_name = $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(role_name.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove assignment: {error}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_assignment(
        &self,
        user_id: &UserId,
        role_name: &RoleName,
    ) -> AppResult<Option<Assignment>> {
        sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT user_id, role_name, predicate, data, assigned_at
            FROM authz_assignments
            WHERE user_id = $1 AND role_name = $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(role_name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find assignment: {error}")))?
        .map(AssignmentRow::into_assignment)
        .transpose()
    }

    async fn list_assignments_for_user(&self, user_id: &UserId) -> AppResult<Vec<Assignment>> {
        sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT user_id, role_name, predicate, data, assigned_at
            FROM authz_assignments
            WHERE user_id = $1
            ORDER BY role_name
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list assignments: {error}")))?
        .into_iter()
        .map(AssignmentRow::into_assignment)
        .collect()
    }
}

fn map_assignment_error(error: sqlx::Error, assignment: &Assignment) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23503")
    {
        return AppError::UnknownRole(assignment.role_name().to_string());
    }

    AppError::Internal(format!("failed to persist assignment: {error}"))
}
