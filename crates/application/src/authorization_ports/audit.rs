use async_trait::async_trait;

use trackstar_core::{AppResult, ProjectId, UserId};
use trackstar_domain::{AuditAction, RoleName};

/// One change to a project's member list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipChange {
    /// User who made the change.
    pub actor: UserId,
    /// Whether the member joined or left.
    pub action: AuditAction,
    /// Project whose rows changed.
    pub project_id: ProjectId,
    /// User whose rows changed.
    pub member: UserId,
    /// Role granted on join. Removals drop every row of the member, so it is
    /// left empty.
    pub role: Option<RoleName>,
}

/// Append-only trail of membership changes.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one change.
    async fn record_membership_change(&self, change: MembershipChange) -> AppResult<()>;
}
