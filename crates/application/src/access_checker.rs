use std::sync::Arc;

use tracing::{debug, warn};
use trackstar_core::{AppError, AppResult, UserId};
use trackstar_domain::{AccessContext, Assignment};

use crate::{AssignmentRepository, PredicateInput, PredicateRegistry, RoleRepository};

/// Answers whether a user may exercise a permission in a context.
#[derive(Clone)]
pub struct AccessChecker {
    roles: Arc<dyn RoleRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    predicates: Arc<PredicateRegistry>,
}

impl AccessChecker {
    /// Creates a checker over role and assignment storage.
    #[must_use]
    pub fn new(
        roles: Arc<dyn RoleRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        predicates: Arc<PredicateRegistry>,
    ) -> Self {
        Self {
            roles,
            assignments,
            predicates,
        }
    }

    /// Returns whether `user_id` holds `permission` in `context`.
    ///
    /// A user holding role `R` is granted `P` when `R` is `P` or one of its
    /// ancestors and the assignment's predicate, if any, holds. Unknown
    /// permissions and users without assignments are denied without error.
    pub async fn check_access(
        &self,
        user_id: &UserId,
        permission: &str,
        context: &AccessContext,
    ) -> AppResult<bool> {
        let permission = permission.trim();
        if permission.is_empty() {
            return Err(AppError::Validation(
                "permission must not be empty".to_owned(),
            ));
        }

        let assignments = self.assignments.list_assignments_for_user(user_id).await?;
        if assignments.is_empty() {
            debug!(user_id = %user_id, permission, "access denied: no assignments");
            return Ok(false);
        }

        let hierarchy = self.roles.load_hierarchy().await?;
        let implying = match hierarchy.roles_implying(permission) {
            Ok(implying) => implying,
            Err(AppError::UnknownRole(_)) => {
                debug!(user_id = %user_id, permission, "access denied: unknown permission");
                return Ok(false);
            }
            Err(error) => return Err(error),
        };

        let granted = assignments
            .iter()
            .filter(|assignment| implying.contains(assignment.role_name()))
            .any(|assignment| self.assignment_grants(assignment, context));

        debug!(user_id = %user_id, permission, granted, "access check evaluated");
        Ok(granted)
    }

    /// Ensures `user_id` holds `permission`, failing with `Forbidden`.
    pub async fn require_access(
        &self,
        user_id: &UserId,
        permission: &str,
        context: &AccessContext,
    ) -> AppResult<()> {
        if self.check_access(user_id, permission, context).await? {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "user '{user_id}' is missing permission '{}'",
            permission.trim()
        )))
    }

    fn assignment_grants(&self, assignment: &Assignment, context: &AccessContext) -> bool {
        let Some(blob) = assignment.predicate() else {
            return true;
        };

        let input = PredicateInput {
            user_id: assignment.user_id(),
            role_name: assignment.role_name(),
            context,
            data: assignment.data(),
            params: &serde_json::Value::Null,
        };

        match blob
            .decode()
            .and_then(|predicate| self.predicates.evaluate(&predicate, &input))
        {
            Ok(result) => result,
            Err(error) => {
                warn!(
                    user_id = %assignment.user_id(),
                    role = %assignment.role_name(),
                    error = %error,
                    "predicate evaluation failed; treating as false"
                );
                false
            }
        }
    }
}
