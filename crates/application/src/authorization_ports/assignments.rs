use async_trait::async_trait;

use trackstar_core::{AppResult, UserId};
use trackstar_domain::{Assignment, RoleName};

/// Repository port for user to role bindings.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Stores an assignment.
    ///
    /// Validation and write happen atomically: `UnknownRole` when the role
    /// is missing, otherwise an existing binding for the same pair is
    /// resolved with [`Assignment::check_reassignment`]. Returns `false`
    /// for an idempotent re-assignment that left the store unchanged.
    async fn assign(&self, assignment: Assignment) -> AppResult<bool>;

    /// Removes a binding; `false` when it did not exist.
    async fn unassign(&self, user_id: &UserId, role_name: &RoleName) -> AppResult<bool>;

    /// Finds one binding.
    async fn find_assignment(
        &self,
        user_id: &UserId,
        role_name: &RoleName,
    ) -> AppResult<Option<Assignment>>;

    /// Lists a user's direct assignments ordered by role name.
    async fn list_assignments_for_user(&self, user_id: &UserId) -> AppResult<Vec<Assignment>>;
}
