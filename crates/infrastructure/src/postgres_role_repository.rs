use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;

use trackstar_application::RoleRepository;
use trackstar_core::{AppError, AppResult};
use trackstar_domain::{RoleDefinition, RoleHierarchy, RoleName};

/// PostgreSQL-backed role registry.
///
/// Mutations lock both role tables so the graph checked in Rust is the
/// graph the write lands on.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin_locked(&self) -> AppResult<Transaction<'static, Postgres>> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        sqlx::query("LOCK TABLE authz_roles, authz_role_parents IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to lock role tables: {error}")))?;

        Ok(transaction)
    }
}

#[derive(Debug, FromRow)]
struct RoleEdgeRow {
    name: String,
    parent_name: Option<String>,
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn load_hierarchy(&self) -> AppResult<RoleHierarchy> {
        let mut connection = self.pool.acquire().await.map_err(|error| {
            AppError::Internal(format!("failed to acquire connection: {error}"))
        })?;

        fetch_hierarchy(&mut connection).await
    }

    async fn create_role(
        &self,
        name: RoleName,
        parent: Option<RoleName>,
    ) -> AppResult<RoleDefinition> {
        let mut transaction = self.begin_locked().await?;
        let definition = fetch_hierarchy(&mut transaction)
            .await?
            .create_role(name, parent)?;

        sqlx::query(
            r#"
            INSERT INTO authz_roles (name)
            VALUES ($1)
            "#,
        )
        .bind(definition.name().as_str())
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_role_conflict(error, definition.name()))?;

        for parent in definition.parents() {
            insert_edge(&mut transaction, definition.name(), parent).await?;
        }

        commit(transaction).await?;
        Ok(definition)
    }

    async fn add_parent(&self, role: &RoleName, parent: &RoleName) -> AppResult<bool> {
        let mut transaction = self.begin_locked().await?;
        let added = fetch_hierarchy(&mut transaction)
            .await?
            .add_parent(role.as_str(), parent.as_str())?;

        if added {
            insert_edge(&mut transaction, role, parent).await?;
        }

        commit(transaction).await?;
        Ok(added)
    }

    async fn remove_parent(&self, role: &RoleName, parent: &RoleName) -> AppResult<bool> {
        let mut transaction = self.begin_locked().await?;
        let removed = fetch_hierarchy(&mut transaction)
            .await?
            .remove_parent(role.as_str(), parent.as_str())?;

        if removed {
            sqlx::query(
                r#"
                DELETE FROM authz_role_parents
                WHERE role_name = $1 AND parent_name = $2
                "#,
            )
            .bind(role.as_str())
            .bind(parent.as_str())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to remove role parent: {error}"))
            })?;
        }

        commit(transaction).await?;
        Ok(removed)
    }

    async fn remove_role(&self, name: &RoleName) -> AppResult<RoleDefinition> {
        let mut transaction = self.begin_locked().await?;
        let definition = fetch_hierarchy(&mut transaction)
            .await?
            .remove_role(name.as_str())?;

        // Edges and assignments go with the row through ON DELETE CASCADE.
        let result = sqlx::query(
            r#"
            DELETE FROM authz_roles
            WHERE name = $1
            "#,
        )
        .bind(name.as_str())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove role: {error}")))?;

        commit(transaction).await?;
        debug!(role = %name, rows = result.rows_affected(), "role row deleted");
        Ok(definition)
    }
}

async fn fetch_hierarchy(connection: &mut PgConnection) -> AppResult<RoleHierarchy> {
    let rows = sqlx::query_as::<_, RoleEdgeRow>(
        r#"
        SELECT roles.name, parents.parent_name
        FROM authz_roles roles
        LEFT JOIN authz_role_parents parents ON parents.role_name = roles.name
        ORDER BY roles.name, parents.parent_name
        "#,
    )
    .fetch_all(&mut *connection)
    .await
    .map_err(|error| AppError::Internal(format!("failed to load roles: {error}")))?;

    aggregate_hierarchy(rows)
}

fn aggregate_hierarchy(rows: Vec<RoleEdgeRow>) -> AppResult<RoleHierarchy> {
    let mut by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in rows {
        let parents = by_name.entry(row.name).or_default();
        if let Some(parent_name) = row.parent_name {
            parents.push(parent_name);
        }
    }

    let definitions = by_name
        .into_iter()
        .map(|(name, parents)| {
            let parents = parents
                .into_iter()
                .map(stored_role_name)
                .collect::<AppResult<Vec<_>>>()?;
            Ok(RoleDefinition::new(stored_role_name(name)?, parents))
        })
        .collect::<AppResult<Vec<_>>>()?;

    RoleHierarchy::from_definitions(definitions)
        .map_err(|error| AppError::Internal(format!("stored role graph is invalid: {error}")))
}

fn stored_role_name(value: String) -> AppResult<RoleName> {
    RoleName::new(value)
        .map_err(|error| AppError::Internal(format!("stored role name is invalid: {error}")))
}

async fn insert_edge(
    transaction: &mut Transaction<'static, Postgres>,
    role: &RoleName,
    parent: &RoleName,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO authz_role_parents (role_name, parent_name)
        VALUES ($1, $2)
        ON CONFLICT (role_name, parent_name) DO NOTHING
        "#,
    )
    .bind(role.as_str())
    .bind(parent.as_str())
    .execute(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to persist role parent: {error}")))?;

    Ok(())
}

async fn commit(transaction: Transaction<'static, Postgres>) -> AppResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
}

fn map_role_conflict(error: sqlx::Error, role_name: &RoleName) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::DuplicateRole(role_name.to_string());
    }

    AppError::Internal(format!("failed to create role: {error}"))
}
