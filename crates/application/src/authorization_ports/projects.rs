use async_trait::async_trait;

use trackstar_core::{AppResult, ProjectId, UserId};
use trackstar_domain::ProjectMember;

/// Repository port for project membership rows.
#[async_trait]
pub trait ProjectMembershipRepository: Send + Sync {
    /// Stores one `(project, user, role)` row; `Conflict` when it exists,
    /// `UnknownRole` when the role is not registered.
    async fn add_member(&self, project_id: ProjectId, member: ProjectMember) -> AppResult<()>;

    /// Removes exactly one row; returns whether it existed.
    async fn remove_membership(
        &self,
        project_id: ProjectId,
        member: &ProjectMember,
    ) -> AppResult<bool>;

    /// Removes every row of the user in the project and returns the count.
    async fn remove_member(&self, project_id: ProjectId, user_id: &UserId) -> AppResult<u64>;

    /// Lists the project rows ordered by user then role.
    async fn list_members(&self, project_id: ProjectId) -> AppResult<Vec<ProjectMember>>;
}
