use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use trackstar_core::{AppError, AppResult, ProjectId, UserId};
use trackstar_domain::{
    ADMIN_ROLE, AccessContext, AssignmentData, AuditAction, OWNER_ROLE, Predicate, PredicateBlob,
    ProjectContext, ProjectMember, RoleName,
};

use crate::{
    AccessChecker, AssignmentService, AuditRepository, MembershipChange,
    ProjectMembershipRepository, RoleRepository,
};

/// Project-scoped membership on top of the role engine.
///
/// Adding a member records a `(project, user, role)` row and binds the role
/// to the user under a `project_membership` predicate, so the role only
/// applies in contexts built from that project's rows.
#[derive(Clone)]
pub struct ProjectMembershipService {
    roles: Arc<dyn RoleRepository>,
    members: Arc<dyn ProjectMembershipRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    assignments: AssignmentService,
    access: AccessChecker,
}

impl ProjectMembershipService {
    /// Creates a membership service.
    #[must_use]
    pub fn new(
        roles: Arc<dyn RoleRepository>,
        members: Arc<dyn ProjectMembershipRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        assignments: AssignmentService,
        access: AccessChecker,
    ) -> Self {
        Self {
            roles,
            members,
            audit_repository,
            assignments,
            access,
        }
    }

    /// Adds `user_id` to a project with `role`.
    ///
    /// A user already holding `role` under another condition is rejected
    /// with `DuplicateAssignment` before any row is written. If binding the
    /// role or recording the change fails, the new row is dropped again.
    pub async fn assign_user(
        &self,
        actor: &UserId,
        project_id: ProjectId,
        user_id: &UserId,
        role: &str,
    ) -> AppResult<()> {
        let role_name =
            RoleName::new(role).map_err(|_| AppError::UnknownRole(role.trim().to_owned()))?;

        if role_name.as_str() == ADMIN_ROLE && !self.is_admin(actor).await? {
            return Err(AppError::Forbidden(format!(
                "user '{actor}' may not grant role '{ADMIN_ROLE}'"
            )));
        }

        if !self.roles.load_hierarchy().await?.contains(role_name.as_str()) {
            return Err(AppError::UnknownRole(role_name.to_string()));
        }

        let membership = Predicate::project_membership(role_name.clone());
        let binding_needed = self
            .needs_binding(user_id, &role_name, &membership)
            .await?;

        let member = ProjectMember {
            user_id: user_id.clone(),
            role: role_name,
        };
        self.members.add_member(project_id, member.clone()).await?;

        if let Err(error) = self
            .bind_member(actor, project_id, &member, binding_needed.then_some(membership))
            .await
        {
            self.drop_row(project_id, &member).await;
            return Err(error);
        }

        info!(
            project_id = %project_id,
            user_id = %member.user_id,
            role = %member.role,
            "project member added"
        );
        Ok(())
    }

    /// Removes every membership row of `user_id` in the project.
    ///
    /// The conditional role binding stays and fails closed without the rows.
    pub async fn remove_user(
        &self,
        actor: &UserId,
        project_id: ProjectId,
        user_id: &UserId,
    ) -> AppResult<u64> {
        let removed = self.members.remove_member(project_id, user_id).await?;
        if removed == 0 {
            return Ok(0);
        }

        self.audit_repository
            .record_membership_change(MembershipChange {
                actor: actor.clone(),
                action: AuditAction::ProjectMemberRemoved,
                project_id,
                member: user_id.clone(),
                role: None,
            })
            .await?;

        info!(project_id = %project_id, user_id = %user_id, removed, "project member removed");
        Ok(removed)
    }

    /// Returns whether the user has any row in the project.
    pub async fn is_user_in_project(
        &self,
        project_id: ProjectId,
        user_id: &UserId,
    ) -> AppResult<bool> {
        Ok(self
            .members
            .list_members(project_id)
            .await?
            .iter()
            .any(|member| &member.user_id == user_id))
    }

    /// Lists the roles `actor` may hand out to project members.
    ///
    /// These are the roles that sit above other roles; `admin` is only
    /// offered to actors who hold it.
    pub async fn role_options(&self, actor: &UserId) -> AppResult<Vec<RoleName>> {
        let hierarchy = self.roles.load_hierarchy().await?;
        let mut options: BTreeSet<RoleName> = hierarchy
            .definitions()
            .iter()
            .flat_map(|definition| definition.parents().iter().cloned())
            .collect();

        if options.contains(ADMIN_ROLE) && !self.is_admin(actor).await? {
            options.remove(ADMIN_ROLE);
        }

        Ok(options.into_iter().collect())
    }

    /// Builds an access context from the project's membership rows.
    pub async fn project_context(
        &self,
        project_id: ProjectId,
        owner_id: Option<UserId>,
    ) -> AppResult<AccessContext> {
        let members = self.members.list_members(project_id).await?;
        let mut project = ProjectContext::new(project_id).with_members(members);
        if let Some(owner_id) = owner_id {
            project = project.with_owner(owner_id);
        }

        Ok(AccessContext::for_project(project))
    }

    /// Ensures `actor` holds `permission` within the project.
    pub async fn verify_permission(
        &self,
        actor: &UserId,
        project_id: ProjectId,
        owner_id: Option<UserId>,
        permission: &str,
    ) -> AppResult<()> {
        let context = self.project_context(project_id, owner_id).await?;
        self.access.require_access(actor, permission, &context).await
    }

    /// Makes the creator of a project its owner.
    pub async fn register_project_owner(
        &self,
        actor: &UserId,
        project_id: ProjectId,
    ) -> AppResult<()> {
        self.assign_user(actor, project_id, actor, OWNER_ROLE).await
    }

    /// Decides whether `user_id` still needs the membership binding.
    ///
    /// An unconditional binding already grants the role in every project and
    /// an identical membership binding is shared across projects. Any other
    /// conditional binding would leave the member without project access, so
    /// it is rejected before a row is written.
    async fn needs_binding(
        &self,
        user_id: &UserId,
        role_name: &RoleName,
        membership: &Predicate,
    ) -> AppResult<bool> {
        let Some(existing) = self
            .assignments
            .assignment(user_id, role_name.as_str())
            .await?
        else {
            return Ok(true);
        };

        if existing.is_conditional() {
            existing.check_reassignment(Some(&PredicateBlob::encode(membership)?))?;
        }

        debug!(user_id = %user_id, role = %role_name, "reusing existing role binding");
        Ok(false)
    }

    async fn bind_member(
        &self,
        actor: &UserId,
        project_id: ProjectId,
        member: &ProjectMember,
        membership: Option<Predicate>,
    ) -> AppResult<()> {
        if let Some(membership) = membership {
            self.assignments
                .assign(
                    &member.user_id,
                    member.role.as_str(),
                    Some(membership),
                    AssignmentData::new(),
                )
                .await?;
        }

        self.audit_repository
            .record_membership_change(MembershipChange {
                actor: actor.clone(),
                action: AuditAction::ProjectMemberAdded,
                project_id,
                member: member.user_id.clone(),
                role: Some(member.role.clone()),
            })
            .await
    }

    async fn drop_row(&self, project_id: ProjectId, member: &ProjectMember) {
        if let Err(error) = self.members.remove_membership(project_id, member).await {
            warn!(
                project_id = %project_id,
                user_id = %member.user_id,
                role = %member.role,
                error = %error,
                "failed to drop project member row"
            );
        }
    }

    async fn is_admin(&self, actor: &UserId) -> AppResult<bool> {
        self.access
            .check_access(actor, ADMIN_ROLE, &AccessContext::new())
            .await
    }
}

#[cfg(test)]
mod tests;
