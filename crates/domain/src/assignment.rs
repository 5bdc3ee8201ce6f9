use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use trackstar_core::{AppError, AppResult, UserId};

use crate::predicate::PredicateBlob;
use crate::role::RoleName;

/// Free-form key/value bag stored with an assignment.
pub type AssignmentData = Map<String, Value>;

/// Binding of one role to one user, optionally guarded by a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    user_id: UserId,
    role_name: RoleName,
    predicate: Option<PredicateBlob>,
    data: AssignmentData,
    assigned_at: DateTime<Utc>,
}

impl Assignment {
    /// Creates a new assignment stamped with the current time.
    #[must_use]
    pub fn new(
        user_id: UserId,
        role_name: RoleName,
        predicate: Option<PredicateBlob>,
        data: AssignmentData,
    ) -> Self {
        Self::restore(user_id, role_name, predicate, data, Utc::now())
    }

    /// Rebuilds an assignment loaded from storage.
    #[must_use]
    pub fn restore(
        user_id: UserId,
        role_name: RoleName,
        predicate: Option<PredicateBlob>,
        data: AssignmentData,
        assigned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            role_name,
            predicate,
            data,
            assigned_at,
        }
    }

    /// Returns the assigned user.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the assigned role.
    #[must_use]
    pub fn role_name(&self) -> &RoleName {
        &self.role_name
    }

    /// Returns the guarding predicate, if any.
    #[must_use]
    pub fn predicate(&self) -> Option<&PredicateBlob> {
        self.predicate.as_ref()
    }

    /// Returns the creation data bag.
    #[must_use]
    pub fn data(&self) -> &AssignmentData {
        &self.data
    }

    /// Returns the assignment timestamp.
    #[must_use]
    pub fn assigned_at(&self) -> DateTime<Utc> {
        self.assigned_at
    }

    /// Returns whether a predicate guards this assignment.
    #[must_use]
    pub fn is_conditional(&self) -> bool {
        self.predicate.is_some()
    }

    /// Decides what re-assigning the same `(user, role)` pair means.
    ///
    /// `Ok(())` signals an idempotent re-assignment of an identical
    /// conditional binding; the stored binding is kept as it is.
    pub fn check_reassignment(&self, requested: Option<&PredicateBlob>) -> AppResult<()> {
        match (&self.predicate, requested) {
            (Some(existing), Some(requested)) if existing == requested => Ok(()),
            (None, _) => Err(AppError::DuplicateAssignment(format!(
                "user '{}' already holds role '{}' unconditionally",
                self.user_id, self.role_name
            ))),
            (Some(_), _) => Err(AppError::DuplicateAssignment(format!(
                "user '{}' already holds role '{}' under a different condition",
                self.user_id, self.role_name
            ))),
        }
    }
}
