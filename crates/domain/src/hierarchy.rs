//! Role inheritance graph.
//!
//! Edges point from a role to its parents. A parent is the broader role:
//! holding it grants everything the child grants. The graph is kept acyclic
//! by every mutating operation, and every failed mutation leaves the graph
//! untouched.

use std::collections::{BTreeMap, BTreeSet};

use trackstar_core::{AppError, AppResult};

use crate::role::{RoleDefinition, RoleName};

/// In-memory role registry graph with cycle detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleHierarchy {
    roles: BTreeMap<RoleName, BTreeSet<RoleName>>,
}

impl RoleHierarchy {
    /// Creates an empty hierarchy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a hierarchy from stored definitions, validating every edge.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = RoleDefinition>,
    ) -> AppResult<Self> {
        let definitions: Vec<RoleDefinition> = definitions.into_iter().collect();
        let mut hierarchy = Self::new();

        for definition in &definitions {
            if hierarchy
                .roles
                .insert(definition.name().clone(), BTreeSet::new())
                .is_some()
            {
                return Err(AppError::DuplicateRole(definition.name().to_string()));
            }
        }

        for definition in &definitions {
            for parent in definition.parents() {
                hierarchy.add_parent(definition.name().as_str(), parent.as_str())?;
            }
        }

        Ok(hierarchy)
    }

    /// Returns whether a role with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    /// Returns the number of roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns whether the hierarchy has no roles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Returns one role definition.
    #[must_use]
    pub fn role(&self, name: &str) -> Option<RoleDefinition> {
        self.roles
            .get_key_value(name)
            .map(|(name, parents)| RoleDefinition::new(name.clone(), parents.iter().cloned()))
    }

    /// Returns all role definitions sorted by name.
    #[must_use]
    pub fn definitions(&self) -> Vec<RoleDefinition> {
        self.roles
            .iter()
            .map(|(name, parents)| RoleDefinition::new(name.clone(), parents.iter().cloned()))
            .collect()
    }

    /// Adds a role, optionally below an existing parent.
    pub fn create_role(
        &mut self,
        name: RoleName,
        parent: Option<RoleName>,
    ) -> AppResult<RoleDefinition> {
        if self.contains(name.as_str()) {
            return Err(AppError::DuplicateRole(name.to_string()));
        }

        if let Some(parent) = &parent {
            if parent == &name {
                return Err(AppError::Cycle(format!(
                    "role '{name}' cannot inherit from itself"
                )));
            }

            if !self.contains(parent.as_str()) {
                return Err(AppError::UnknownParent(parent.to_string()));
            }
        }

        let parents: BTreeSet<RoleName> = parent.into_iter().collect();
        let definition = RoleDefinition::new(name.clone(), parents.iter().cloned());
        self.roles.insert(name, parents);

        Ok(definition)
    }

    /// Links `parent` above `role`.
    ///
    /// Returns `false` when the edge already existed.
    pub fn add_parent(&mut self, role: &str, parent: &str) -> AppResult<bool> {
        let Some(existing_parents) = self.roles.get(role) else {
            return Err(AppError::UnknownRole(role.to_owned()));
        };

        let Some((parent_name, _)) = self.roles.get_key_value(parent) else {
            return Err(AppError::UnknownParent(parent.to_owned()));
        };

        if existing_parents.contains(parent) {
            return Ok(false);
        }

        if role == parent || self.is_ancestor(role, parent) {
            return Err(AppError::Cycle(format!(
                "adding '{parent}' as parent of '{role}' would create a loop"
            )));
        }

        let parent_name = parent_name.clone();
        Ok(self
            .roles
            .get_mut(role)
            .is_some_and(|parents| parents.insert(parent_name)))
    }

    /// Unlinks `parent` from `role`.
    ///
    /// Returns `false` when the edge did not exist.
    pub fn remove_parent(&mut self, role: &str, parent: &str) -> AppResult<bool> {
        self.roles
            .get_mut(role)
            .map(|parents| parents.remove(parent))
            .ok_or_else(|| AppError::UnknownRole(role.to_owned()))
    }

    /// Removes a role and every edge touching it.
    pub fn remove_role(&mut self, name: &str) -> AppResult<RoleDefinition> {
        let Some((name, parents)) = self.roles.remove_entry(name) else {
            return Err(AppError::UnknownRole(name.to_owned()));
        };

        for remaining_parents in self.roles.values_mut() {
            remaining_parents.remove(name.as_str());
        }

        Ok(RoleDefinition::new(name, parents))
    }

    /// Returns `name` together with every role that transitively includes it.
    pub fn roles_implying(&self, name: &str) -> AppResult<BTreeSet<RoleName>> {
        let Some((name, _)) = self.roles.get_key_value(name) else {
            return Err(AppError::UnknownRole(name.to_owned()));
        };

        let mut implying = BTreeSet::new();
        let mut pending = vec![name.clone()];

        while let Some(current) = pending.pop() {
            if let Some(parents) = self.roles.get(current.as_str()) {
                pending.extend(
                    parents
                        .iter()
                        .filter(|parent| !implying.contains(*parent))
                        .cloned(),
                );
            }
            implying.insert(current);
        }

        Ok(implying)
    }

    /// Returns whether holding `held` grants `permission`.
    ///
    /// Unknown roles on either side never imply anything.
    #[must_use]
    pub fn implies(&self, held: &str, permission: &str) -> bool {
        self.roles_implying(permission)
            .is_ok_and(|implying| implying.contains(held))
    }

    fn is_ancestor(&self, candidate: &str, of: &str) -> bool {
        self.roles_implying(of)
            .is_ok_and(|ancestors| ancestors.contains(candidate))
    }
}
