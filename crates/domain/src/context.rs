use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trackstar_core::{ProjectId, UserId};

use crate::role::RoleName;

/// One `(user, role)` membership row of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMember {
    /// Member user.
    pub user_id: UserId,
    /// Role the user holds inside the project.
    pub role: RoleName,
}

/// Project data a caller supplies for one access check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    project_id: ProjectId,
    owner_id: Option<UserId>,
    #[serde(default)]
    members: Vec<ProjectMember>,
}

impl ProjectContext {
    /// Creates a project context without owner or members.
    #[must_use]
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            owner_id: None,
            members: Vec::new(),
        }
    }

    /// Sets the project owner.
    #[must_use]
    pub fn with_owner(mut self, owner_id: UserId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Adds one membership row.
    #[must_use]
    pub fn with_member(mut self, user_id: UserId, role: RoleName) -> Self {
        self.members.push(ProjectMember { user_id, role });
        self
    }

    /// Adds membership rows.
    #[must_use]
    pub fn with_members(mut self, members: impl IntoIterator<Item = ProjectMember>) -> Self {
        self.members.extend(members);
        self
    }

    /// Returns the project identifier.
    #[must_use]
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the project owner, when known.
    #[must_use]
    pub fn owner_id(&self) -> Option<&UserId> {
        self.owner_id.as_ref()
    }

    /// Returns the loaded membership rows.
    #[must_use]
    pub fn members(&self) -> &[ProjectMember] {
        &self.members
    }

    /// Returns whether a membership row `(user_id, role)` exists.
    #[must_use]
    pub fn has_member(&self, user_id: &UserId, role: &str) -> bool {
        self.members
            .iter()
            .any(|member| &member.user_id == user_id && member.role.as_str() == role)
    }

    /// Returns whether `user_id` owns the project.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.owner_id.as_ref() == Some(user_id)
    }
}

/// Runtime values for one authorization check. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessContext {
    project: Option<ProjectContext>,
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
}

impl AccessContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context scoped to one project.
    #[must_use]
    pub fn for_project(project: ProjectContext) -> Self {
        Self::new().with_project(project)
    }

    /// Sets the project value.
    #[must_use]
    pub fn with_project(mut self, project: ProjectContext) -> Self {
        self.project = Some(project);
        self
    }

    /// Sets one free-form attribute for custom evaluators.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Returns the project value, when supplied.
    #[must_use]
    pub fn project(&self) -> Option<&ProjectContext> {
        self.project.as_ref()
    }

    /// Returns one attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}
