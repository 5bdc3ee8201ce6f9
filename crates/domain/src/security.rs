use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by administrative use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a user joins a project.
    ProjectMemberAdded,
    /// Emitted when a user leaves a project.
    ProjectMemberRemoved,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectMemberAdded => "project.member.added",
            Self::ProjectMemberRemoved => "project.member.removed",
        }
    }
}
