use std::sync::Arc;

use tracing::{debug, info};
use trackstar_core::{AppError, AppResult, UserId};
use trackstar_domain::{Assignment, AssignmentData, Predicate, PredicateBlob, RoleName};

use crate::{AssignmentRepository, PredicateRegistry};

/// Application service for user to role bindings.
#[derive(Clone)]
pub struct AssignmentService {
    assignments: Arc<dyn AssignmentRepository>,
    predicates: Arc<PredicateRegistry>,
}

impl AssignmentService {
    /// Creates an assignment service.
    #[must_use]
    pub fn new(
        assignments: Arc<dyn AssignmentRepository>,
        predicates: Arc<PredicateRegistry>,
    ) -> Self {
        Self {
            assignments,
            predicates,
        }
    }

    /// Binds `role` to `user_id`, optionally under a predicate.
    ///
    /// Re-assigning an identical conditional binding succeeds without
    /// change; any other repeat of the pair is `DuplicateAssignment`.
    pub async fn assign(
        &self,
        user_id: &UserId,
        role: &str,
        predicate: Option<Predicate>,
        data: AssignmentData,
    ) -> AppResult<()> {
        let role_name =
            RoleName::new(role).map_err(|_| AppError::UnknownRole(role.trim().to_owned()))?;

        let blob = match &predicate {
            Some(predicate) => {
                self.predicates.validate(predicate)?;
                Some(PredicateBlob::encode(predicate)?)
            }
            None => None,
        };

        let stored = self
            .assignments
            .assign(Assignment::new(user_id.clone(), role_name.clone(), blob, data))
            .await?;

        if stored {
            info!(
                user_id = %user_id,
                role = %role_name,
                predicate = predicate.as_ref().map(Predicate::kind),
                "role assigned"
            );
        } else {
            debug!(user_id = %user_id, role = %role_name, "role already assigned");
        }
        Ok(())
    }

    /// Removes the binding if present; absent bindings are a no-op.
    pub async fn unassign(&self, user_id: &UserId, role: &str) -> AppResult<()> {
        let Ok(role_name) = RoleName::new(role) else {
            return Ok(());
        };

        if self.assignments.unassign(user_id, &role_name).await? {
            info!(user_id = %user_id, role = %role_name, "role unassigned");
        }
        Ok(())
    }

    /// Returns whether a direct binding exists, ignoring any predicate.
    pub async fn is_assigned(&self, user_id: &UserId, role: &str) -> AppResult<bool> {
        Ok(self.assignment(user_id, role).await?.is_some())
    }

    /// Returns the direct binding of `role` to `user_id`, if any.
    pub async fn assignment(&self, user_id: &UserId, role: &str) -> AppResult<Option<Assignment>> {
        let Ok(role_name) = RoleName::new(role) else {
            return Ok(None);
        };

        self.assignments.find_assignment(user_id, &role_name).await
    }

    /// Lists a user's direct assignments.
    pub async fn assignments_for(&self, user_id: &UserId) -> AppResult<Vec<Assignment>> {
        self.assignments.list_assignments_for_user(user_id).await
    }
}
