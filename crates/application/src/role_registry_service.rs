use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;
use trackstar_core::{AppError, AppResult};
use trackstar_domain::{RoleDefinition, RoleName, default_role_catalogue};

use crate::RoleRepository;

/// Application service maintaining the role hierarchy.
#[derive(Clone)]
pub struct RoleRegistryService {
    roles: Arc<dyn RoleRepository>,
}

impl RoleRegistryService {
    /// Creates a registry service from a role repository.
    #[must_use]
    pub fn new(roles: Arc<dyn RoleRepository>) -> Self {
        Self { roles }
    }

    /// Creates a role, optionally below an existing parent.
    pub async fn create_role(&self, name: &str, parent: Option<&str>) -> AppResult<RoleDefinition> {
        let name = RoleName::new(name)?;
        let parent = parent.map(existing_parent).transpose()?;

        let definition = self.roles.create_role(name, parent).await?;
        info!(
            role = %definition.name(),
            parents = ?definition.parents(),
            "role created"
        );
        Ok(definition)
    }

    /// Links an existing role below another existing role.
    ///
    /// Returns `false` when the edge already existed.
    pub async fn add_parent(&self, role: &str, parent: &str) -> AppResult<bool> {
        let role = existing_role(role)?;
        let parent = existing_parent(parent)?;

        let added = self.roles.add_parent(&role, &parent).await?;
        if added {
            info!(role = %role, parent = %parent, "role parent added");
        }
        Ok(added)
    }

    /// Removes a parent link; `false` when the edge did not exist.
    pub async fn remove_parent(&self, role: &str, parent: &str) -> AppResult<bool> {
        let role = existing_role(role)?;
        let parent = existing_parent(parent)?;

        let removed = self.roles.remove_parent(&role, &parent).await?;
        if removed {
            info!(role = %role, parent = %parent, "role parent removed");
        }
        Ok(removed)
    }

    /// Removes a role together with its edges and every assignment of it.
    pub async fn remove_role(&self, name: &str) -> AppResult<RoleDefinition> {
        let name = existing_role(name)?;

        let definition = self.roles.remove_role(&name).await?;
        info!(role = %name, "role removed");
        Ok(definition)
    }

    /// Returns the role itself plus every role that transitively implies it.
    pub async fn roles_implying(&self, name: &str) -> AppResult<BTreeSet<RoleName>> {
        self.roles.load_hierarchy().await?.roles_implying(name.trim())
    }

    /// Lists every role ordered by name.
    pub async fn list_roles(&self) -> AppResult<Vec<RoleDefinition>> {
        Ok(self.roles.load_hierarchy().await?.definitions())
    }

    /// Installs missing catalogue roles and parent links.
    ///
    /// Returns how many roles were created; running it again creates none.
    pub async fn seed_default_roles(&self) -> AppResult<usize> {
        let hierarchy = self.roles.load_hierarchy().await?;
        let mut created = 0;

        for entry in default_role_catalogue() {
            let name = RoleName::new(entry.name)?;
            let parent = entry.parent.map(RoleName::new).transpose()?;

            if !hierarchy.contains(entry.name) {
                match self.roles.create_role(name.clone(), parent.clone()).await {
                    Ok(_) => created += 1,
                    Err(AppError::DuplicateRole(_)) => {}
                    Err(error) => return Err(error),
                }
            }

            if let Some(parent) = parent {
                self.roles.add_parent(&name, &parent).await?;
            }
        }

        info!(created, "default role catalogue seeded");
        Ok(created)
    }
}

// A name that fails validation cannot be stored, so lookups report it as unknown.
fn existing_role(name: &str) -> AppResult<RoleName> {
    RoleName::new(name).map_err(|_| AppError::UnknownRole(name.trim().to_owned()))
}

fn existing_parent(name: &str) -> AppResult<RoleName> {
    RoleName::new(name).map_err(|_| AppError::UnknownParent(name.trim().to_owned()))
}
