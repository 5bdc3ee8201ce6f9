use async_trait::async_trait;

use trackstar_core::AppResult;
use trackstar_domain::{RoleDefinition, RoleHierarchy, RoleName};

/// Repository port for the role registry.
///
/// Mutations are rare and administrative; implementations may serialize
/// them globally. Every failed mutation must leave the stored graph intact.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Loads the whole hierarchy as one consistent snapshot.
    async fn load_hierarchy(&self) -> AppResult<RoleHierarchy>;

    /// Creates a role, optionally below an existing parent.
    async fn create_role(
        &self,
        name: RoleName,
        parent: Option<RoleName>,
    ) -> AppResult<RoleDefinition>;

    /// Links `parent` above `role`; `false` when the edge already existed.
    async fn add_parent(&self, role: &RoleName, parent: &RoleName) -> AppResult<bool>;

    /// Unlinks `parent` from `role`; `false` when the edge did not exist.
    async fn remove_parent(&self, role: &RoleName, parent: &RoleName) -> AppResult<bool>;

    /// Removes a role and every edge touching it.
    ///
    /// Implementations must not leave assignments referencing the removed
    /// role behind.
    async fn remove_role(&self, name: &RoleName) -> AppResult<RoleDefinition>;
}
