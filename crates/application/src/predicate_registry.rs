use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use trackstar_core::{AppError, AppResult, UserId};
use trackstar_domain::{AccessContext, AssignmentData, Predicate, RoleName};

/// Values available to a predicate during one access check.
#[derive(Debug, Clone, Copy)]
pub struct PredicateInput<'a> {
    /// User being checked.
    pub user_id: &'a UserId,
    /// Role of the assignment carrying the predicate.
    pub role_name: &'a RoleName,
    /// Caller-supplied context.
    pub context: &'a AccessContext,
    /// Data stored with the assignment.
    pub data: &'a AssignmentData,
    /// Custom predicate parameters; `Value::Null` for built-in kinds.
    pub params: &'a Value,
}

/// Pure boolean condition registered under a custom predicate name.
///
/// Evaluators must not perform I/O; everything they need travels in the
/// context or the assignment data.
pub trait PredicateEvaluator: Send + Sync {
    /// Evaluates the condition. Errors are treated as a failed condition.
    fn evaluate(&self, input: &PredicateInput<'_>) -> AppResult<bool>;
}

impl<F> PredicateEvaluator for F
where
    F: Fn(&PredicateInput<'_>) -> AppResult<bool> + Send + Sync,
{
    fn evaluate(&self, input: &PredicateInput<'_>) -> AppResult<bool> {
        self(input)
    }
}

/// Evaluators for built-in and custom predicate kinds.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    evaluators: HashMap<String, Arc<dyn PredicateEvaluator>>,
}

impl PredicateRegistry {
    /// Creates a registry that only knows the built-in kinds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom evaluator, replacing any previous one of that name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        evaluator: impl PredicateEvaluator + 'static,
    ) -> Option<Arc<dyn PredicateEvaluator>> {
        self.evaluators.insert(name.into(), Arc::new(evaluator))
    }

    /// Builder form of [`PredicateRegistry::register`].
    #[must_use]
    pub fn with_evaluator(
        mut self,
        name: impl Into<String>,
        evaluator: impl PredicateEvaluator + 'static,
    ) -> Self {
        self.register(name, evaluator);
        self
    }

    /// Returns whether a custom evaluator is registered under `name`.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.evaluators.contains_key(name)
    }

    /// Rejects predicates that could never be evaluated.
    pub fn validate(&self, predicate: &Predicate) -> AppResult<()> {
        match predicate {
            Predicate::Custom { name, .. } if !self.is_registered(name) => Err(
                AppError::MalformedPredicate(format!("no evaluator registered for '{name}'")),
            ),
            _ => Ok(()),
        }
    }

    /// Evaluates a decoded predicate.
    pub fn evaluate(&self, predicate: &Predicate, input: &PredicateInput<'_>) -> AppResult<bool> {
        match predicate {
            Predicate::AlwaysTrue => Ok(true),
            Predicate::ProjectMembership { role } => Ok(input
                .context
                .project()
                .is_some_and(|project| project.has_member(input.user_id, role.as_str()))),
            Predicate::ProjectOwner => Ok(input
                .context
                .project()
                .is_some_and(|project| project.is_owned_by(input.user_id))),
            Predicate::Custom { name, params } => {
                let evaluator = self.evaluators.get(name).ok_or_else(|| {
                    AppError::MalformedPredicate(format!("no evaluator registered for '{name}'"))
                })?;
                evaluator.evaluate(&PredicateInput { params, ..*input })
            }
        }
    }
}
