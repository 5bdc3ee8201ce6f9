use async_trait::async_trait;
use tokio::sync::RwLock;

use trackstar_application::{AuditRepository, MembershipChange};
use trackstar_core::{AppResult, ProjectId};

/// Membership changes kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    changes: RwLock<Vec<MembershipChange>>,
}

impl InMemoryAuditRepository {
    /// Creates an empty trail.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the changes recorded for one project, oldest first.
    pub async fn changes_for_project(&self, project_id: ProjectId) -> Vec<MembershipChange> {
        self.changes
            .read()
            .await
            .iter()
            .filter(|change| change.project_id == project_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn record_membership_change(&self, change: MembershipChange) -> AppResult<()> {
        self.changes.write().await.push(change);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use trackstar_application::{AuditRepository, MembershipChange};
    use trackstar_core::{ProjectId, UserId};
    use trackstar_domain::{AuditAction, RoleName};

    use super::InMemoryAuditRepository;

    fn change(project_id: i64, action: AuditAction, role: Option<&str>) -> MembershipChange {
        let (Ok(actor), Ok(member)) = (UserId::new("root"), UserId::new("bob")) else {
            panic!("invalid test users");
        };
        MembershipChange {
            actor,
            action,
            project_id: ProjectId::new(project_id),
            member,
            role: role.map(|role| match RoleName::new(role) {
                Ok(role) => role,
                Err(error) => panic!("invalid test role: {error}"),
            }),
        }
    }

    #[tokio::test]
    async fn changes_are_listed_per_project_in_order() {
        let repository = InMemoryAuditRepository::new();
        let joined = change(7, AuditAction::ProjectMemberAdded, Some("member"));
        let elsewhere = change(8, AuditAction::ProjectMemberAdded, Some("reader"));
        let left = change(7, AuditAction::ProjectMemberRemoved, None);

        for recorded in [joined.clone(), elsewhere.clone(), left.clone()] {
            assert!(repository.record_membership_change(recorded).await.is_ok());
        }

        assert_eq!(
            repository.changes_for_project(ProjectId::new(7)).await,
            vec![joined, left]
        );
        assert_eq!(
            repository.changes_for_project(ProjectId::new(8)).await,
            vec![elsewhere]
        );
        assert!(
            repository
                .changes_for_project(ProjectId::new(9))
                .await
                .is_empty()
        );
    }
}
