use serde::{Deserialize, Serialize};
use serde_json::Value;
use trackstar_core::{AppError, AppResult};

use crate::role::RoleName;

/// Condition attached to an assignment, evaluated at check time.
///
/// Required context keys per kind:
/// - `always_true`: none.
/// - `project_membership`: `project`, with its membership rows loaded.
/// - `project_owner`: `project`, with its owner set.
/// - `custom`: whatever the registered evaluator documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Always satisfied.
    AlwaysTrue,
    /// The context project lists the user as a member with `role`.
    ProjectMembership {
        /// Role the membership row must carry.
        role: RoleName,
    },
    /// The context project is owned by the user.
    ProjectOwner,
    /// Evaluated by an evaluator registered under `name`.
    Custom {
        /// Registered evaluator name.
        name: String,
        /// Evaluator parameters.
        #[serde(default)]
        params: Value,
    },
}

impl Predicate {
    /// Creates a project membership predicate for one role.
    #[must_use]
    pub fn project_membership(role: RoleName) -> Self {
        Self::ProjectMembership { role }
    }

    /// Creates a predicate handled by a registered evaluator.
    #[must_use]
    pub fn custom(name: impl Into<String>, params: Value) -> Self {
        Self::Custom {
            name: name.into(),
            params,
        }
    }

    /// Returns the kind tag, or the evaluator name for custom predicates.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::AlwaysTrue => "always_true",
            Self::ProjectMembership { .. } => "project_membership",
            Self::ProjectOwner => "project_owner",
            Self::Custom { name, .. } => name.as_str(),
        }
    }
}

/// Persisted, uninterpreted predicate payload.
///
/// Stores keep blobs opaque. Decoding happens only when an access check
/// needs the predicate, so a corrupt row denies access instead of breaking
/// every read of the assignment table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredicateBlob(Value);

impl PredicateBlob {
    /// Encodes a predicate.
    pub fn encode(predicate: &Predicate) -> AppResult<Self> {
        serde_json::to_value(predicate)
            .map(Self)
            .map_err(|error| AppError::Internal(format!("failed to encode predicate: {error}")))
    }

    /// Wraps a stored text column without validating it.
    #[must_use]
    pub fn from_stored(value: &str) -> Self {
        Self(serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned())))
    }

    /// Wraps an arbitrary JSON value without validating it.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Returns the text stored for this blob.
    #[must_use]
    pub fn to_stored(&self) -> String {
        self.0.to_string()
    }

    /// Returns the raw JSON value.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Decodes the blob into a predicate.
    pub fn decode(&self) -> AppResult<Predicate> {
        serde_json::from_value(self.0.clone())
            .map_err(|error| AppError::MalformedPredicate(format!("{error} in {}", self.0)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use trackstar_core::AppError;

    use super::{Predicate, PredicateBlob};
    use crate::role::RoleName;

    #[test]
    fn predicate_blob_carries_kind_tag() {
        let Ok(role) = RoleName::new("member") else {
            panic!("valid role name");
        };
        let blob = PredicateBlob::encode(&Predicate::project_membership(role));
        let Ok(blob) = blob else {
            panic!("predicate encodes");
        };

        assert_eq!(
            blob.as_value(),
            &json!({"kind": "project_membership", "role": "member"})
        );
        assert!(matches!(
            blob.decode(),
            Ok(Predicate::ProjectMembership { ref role }) if role.as_str() == "member"
        ));
    }

    #[test]
    fn unknown_kind_is_malformed() {
        let blob = PredicateBlob::from_value(json!({"kind": "eval", "code": "return true;"}));
        assert!(matches!(blob.decode(), Err(AppError::MalformedPredicate(_))));
    }

    #[test]
    fn non_json_storage_is_kept_and_decodes_as_malformed() {
        let blob = PredicateBlob::from_stored("return isset($params['project']);");
        assert!(matches!(blob.decode(), Err(AppError::MalformedPredicate(_))));
    }

    #[test]
    fn custom_params_default_to_null() {
        let blob = PredicateBlob::from_stored(r#"{"kind":"custom","name":"weekday"}"#);
        assert!(matches!(
            blob.decode(),
            Ok(Predicate::Custom { ref name, ref params }) if name == "weekday" && params.is_null()
        ));
    }
}
