//! Fake repositories shared by service tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use trackstar_core::{AppError, AppResult, ProjectId, UserId};
use trackstar_domain::{
    Assignment, ProjectMember, RoleDefinition, RoleHierarchy, RoleName, default_role_catalogue,
};

use crate::{
    AssignmentRepository, AuditRepository, MembershipChange, ProjectMembershipRepository,
    RoleRepository,
};

pub(crate) fn user(value: &str) -> UserId {
    match UserId::new(value) {
        Ok(user_id) => user_id,
        Err(error) => panic!("invalid test user '{value}': {error}"),
    }
}

pub(crate) fn role(value: &str) -> RoleName {
    match RoleName::new(value) {
        Ok(role) => role,
        Err(error) => panic!("invalid test role '{value}': {error}"),
    }
}

#[derive(Default)]
struct FakeAuthorizationState {
    hierarchy: RoleHierarchy,
    assignments: BTreeMap<(UserId, RoleName), Assignment>,
}

/// Roles and assignments behind one lock, like the real adapters.
#[derive(Default)]
pub(crate) struct FakeAuthorizationRepository {
    state: Mutex<FakeAuthorizationState>,
}

impl FakeAuthorizationRepository {
    pub(crate) async fn with_roles(roles: &[(&str, Option<&str>)]) -> Self {
        let repository = Self::default();
        {
            let mut state = repository.state.lock().await;
            for (name, parent) in roles {
                if let Err(error) = state.hierarchy.create_role(role(name), parent.map(role)) {
                    panic!("failed to seed fake role '{name}': {error}");
                }
            }
        }
        repository
    }

    pub(crate) async fn with_catalogue() -> Self {
        let roles: Vec<(&str, Option<&str>)> = default_role_catalogue()
            .iter()
            .map(|entry| (entry.name, entry.parent))
            .collect();
        Self::with_roles(&roles).await
    }

    pub(crate) async fn assignment_count(&self) -> usize {
        self.state.lock().await.assignments.len()
    }
}

#[async_trait]
impl RoleRepository for FakeAuthorizationRepository {
    async fn load_hierarchy(&self) -> AppResult<RoleHierarchy> {
        Ok(self.state.lock().await.hierarchy.clone())
    }

    async fn create_role(
        &self,
        name: RoleName,
        parent: Option<RoleName>,
    ) -> AppResult<RoleDefinition> {
        self.state.lock().await.hierarchy.create_role(name, parent)
    }

    async fn add_parent(&self, role: &RoleName, parent: &RoleName) -> AppResult<bool> {
        self.state
            .lock()
            .await
            .hierarchy
            .add_parent(role.as_str(), parent.as_str())
    }

    async fn remove_parent(&self, role: &RoleName, parent: &RoleName) -> AppResult<bool> {
        self.state
            .lock()
            .await
            .hierarchy
            .remove_parent(role.as_str(), parent.as_str())
    }

    async fn remove_role(&self, name: &RoleName) -> AppResult<RoleDefinition> {
        let mut state = self.state.lock().await;
        let removed = state.hierarchy.remove_role(name.as_str())?;
        state
            .assignments
            .retain(|(_, role_name), _| role_name != name);
        Ok(removed)
    }
}

#[async_trait]
impl AssignmentRepository for FakeAuthorizationRepository {
    async fn assign(&self, assignment: Assignment) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        if !state.hierarchy.contains(assignment.role_name().as_str()) {
            return Err(AppError::UnknownRole(assignment.role_name().to_string()));
        }

        let key = (
            assignment.user_id().clone(),
            assignment.role_name().clone(),
        );
        if let Some(existing) = state.assignments.get(&key) {
            existing.check_reassignment(assignment.predicate())?;
            return Ok(false);
        }

        state.assignments.insert(key, assignment);
        Ok(true)
    }

    async fn unassign(&self, user_id: &UserId, role_name: &RoleName) -> AppResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .assignments
            .remove(&(user_id.clone(), role_name.clone()))
            .is_some())
    }

    async fn find_assignment(
        &self,
        user_id: &UserId,
        role_name: &RoleName,
    ) -> AppResult<Option<Assignment>> {
        Ok(self
            .state
            .lock()
            .await
            .assignments
            .get(&(user_id.clone(), role_name.clone()))
            .cloned())
    }

    async fn list_assignments_for_user(&self, user_id: &UserId) -> AppResult<Vec<Assignment>> {
        Ok(self
            .state
            .lock()
            .await
            .assignments
            .values()
            .filter(|assignment| assignment.user_id() == user_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct FakeProjectMembershipRepository {
    members: Mutex<Vec<(ProjectId, ProjectMember)>>,
}

#[async_trait]
impl ProjectMembershipRepository for FakeProjectMembershipRepository {
    async fn add_member(&self, project_id: ProjectId, member: ProjectMember) -> AppResult<()> {
        let mut members = self.members.lock().await;
        if members
            .iter()
            .any(|(stored_project_id, stored)| stored_project_id == &project_id && stored == &member)
        {
            return Err(AppError::Conflict(format!(
                "user '{}' already holds role '{}' in project '{project_id}'",
                member.user_id, member.role
            )));
        }

        members.push((project_id, member));
        Ok(())
    }

    async fn remove_membership(
        &self,
        project_id: ProjectId,
        member: &ProjectMember,
    ) -> AppResult<bool> {
        let mut members = self.members.lock().await;
        let before = members.len();
        members.retain(|(stored_project_id, stored)| {
            !(stored_project_id == &project_id && stored == member)
        });
        Ok(members.len() < before)
    }

    async fn remove_member(&self, project_id: ProjectId, user_id: &UserId) -> AppResult<u64> {
        let mut members = self.members.lock().await;
        let before = members.len();
        members.retain(|(stored_project_id, stored)| {
            !(stored_project_id == &project_id && &stored.user_id == user_id)
        });
        Ok(u64::try_from(before - members.len()).unwrap_or(u64::MAX))
    }

    async fn list_members(&self, project_id: ProjectId) -> AppResult<Vec<ProjectMember>> {
        Ok(self
            .members
            .lock()
            .await
            .iter()
            .filter(|(stored_project_id, _)| stored_project_id == &project_id)
            .map(|(_, member)| member.clone())
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    pub(crate) changes: Mutex<Vec<MembershipChange>>,
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn record_membership_change(&self, change: MembershipChange) -> AppResult<()> {
        self.changes.lock().await.push(change);
        Ok(())
    }
}
