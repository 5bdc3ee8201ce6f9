use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use trackstar_application::{AssignmentRepository, ProjectMembershipRepository, RoleRepository};
use trackstar_core::{AppError, AppResult, ProjectId, UserId};
use trackstar_domain::{Assignment, ProjectMember, RoleDefinition, RoleHierarchy, RoleName};

#[derive(Debug, Default)]
struct AuthorizationState {
    hierarchy: RoleHierarchy,
    assignments: BTreeMap<(UserId, RoleName), Assignment>,
    project_rows: BTreeSet<(ProjectId, UserId, RoleName)>,
}

/// In-memory role registry, assignment store and project rows.
///
/// Everything lives behind one lock so role removal takes the role's
/// assignments and project rows with it, and assignment validation never
/// interleaves with it.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationRepository {
    state: RwLock<AuthorizationState>,
}

impl InMemoryAuthorizationRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleRepository for InMemoryAuthorizationRepository {
    async fn load_hierarchy(&self) -> AppResult<RoleHierarchy> {
        Ok(self.state.read().await.hierarchy.clone())
    }

    async fn create_role(
        &self,
        name: RoleName,
        parent: Option<RoleName>,
    ) -> AppResult<RoleDefinition> {
        self.state.write().await.hierarchy.create_role(name, parent)
    }

    async fn add_parent(&self, role: &RoleName, parent: &RoleName) -> AppResult<bool> {
        self.state
            .write()
            .await
            .hierarchy
            .add_parent(role.as_str(), parent.as_str())
    }

    async fn remove_parent(&self, role: &RoleName, parent: &RoleName) -> AppResult<bool> {
        self.state
            .write()
            .await
            .hierarchy
            .remove_parent(role.as_str(), parent.as_str())
    }

    async fn remove_role(&self, name: &RoleName) -> AppResult<RoleDefinition> {
        let mut state = self.state.write().await;
        let definition = state.hierarchy.remove_role(name.as_str())?;
        state
            .assignments
            .retain(|(_, role_name), _| role_name != name);
        state
            .project_rows
            .retain(|(_, _, role_name)| role_name != name);

        Ok(definition)
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryAuthorizationRepository {
    async fn assign(&self, assignment: Assignment) -> AppResult<bool> {
        let mut state = self.state.write().await;
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
        let key = (user_id.clone(), role_name.clone());
        Ok(self.state.write().await.assignments.remove(&key).is_some())
    }

    async fn find_assignment(
        &self,
        user_id: &UserId,
        role_name: &RoleName,
    ) -> AppResult<Option<Assignment>> {
        let key = (user_id.clone(), role_name.clone());
        Ok(self.state.read().await.assignments.get(&key).cloned())
    }

    async fn list_assignments_for_user(&self, user_id: &UserId) -> AppResult<Vec<Assignment>> {
        let state = self.state.read().await;

        Ok(state
            .assignments
            .iter()
            .filter_map(|((stored_user_id, _), assignment)| {
                (stored_user_id == user_id).then(|| assignment.clone())
            })
            .collect())
    }
}

#[async_trait]
impl ProjectMembershipRepository for InMemoryAuthorizationRepository {
    async fn add_member(&self, project_id: ProjectId, member: ProjectMember) -> AppResult<()> {
        let ProjectMember { user_id, role } = member;
        let mut state = self.state.write().await;
        if !state.hierarchy.contains(role.as_str()) {
            return Err(AppError::UnknownRole(role.to_string()));
        }

        if !state
            .project_rows
            .insert((project_id, user_id.clone(), role.clone()))
        {
            return Err(AppError::Conflict(format!(
                "user '{user_id}' already holds role '{role}' in project '{project_id}'"
            )));
        }

        Ok(())
    }

    async fn remove_membership(
        &self,
        project_id: ProjectId,
        member: &ProjectMember,
    ) -> AppResult<bool> {
        let key = (project_id, member.user_id.clone(), member.role.clone());
        Ok(self.state.write().await.project_rows.remove(&key))
    }

    async fn remove_member(&self, project_id: ProjectId, user_id: &UserId) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let before = state.project_rows.len();
        state
            .project_rows
            .retain(|(stored_project_id, stored_user_id, _)| {
                !(stored_project_id == &project_id && stored_user_id == user_id)
            });

        Ok(u64::try_from(before - state.project_rows.len()).unwrap_or(u64::MAX))
    }

    async fn list_members(&self, project_id: ProjectId) -> AppResult<Vec<ProjectMember>> {
        let state = self.state.read().await;

        Ok(state
            .project_rows
            .iter()
            .filter(|(stored_project_id, _, _)| stored_project_id == &project_id)
            .map(|(_, user_id, role)| ProjectMember {
                user_id: user_id.clone(),
                role: role.clone(),
            })
            .collect())
    }
}
