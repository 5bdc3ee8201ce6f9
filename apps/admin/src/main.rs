//! TrackStar authorization administration CLI.

#![forbid(unsafe_code)]

mod admin_command;
mod admin_config;
mod admin_services;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trackstar_core::{AppError, AppResult};
use trackstar_domain::{AccessContext, AssignmentData};

use crate::admin_command::{AdminCli, AdminCommand};
use crate::admin_config::AdminConfig;
use crate::admin_services::AdminServices;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let command = AdminCli::parse().command;
    let config = AdminConfig::load()?;
    let services = AdminServices::connect(&config).await?;

    if command == AdminCommand::Migrate {
        info!(storage = ?config.storage, "storage ready; migrations applied");
        return Ok(());
    }

    if config.seed_default_roles && command != AdminCommand::Seed {
        services.role_registry.seed_default_roles().await?;
    }

    let output = execute(command, &services).await?;
    if !output.is_empty() {
        println!("{output}");
    }

    Ok(())
}

async fn execute(command: AdminCommand, services: &AdminServices) -> AppResult<String> {
    match command {
        AdminCommand::Migrate => Ok(String::new()),
        AdminCommand::Seed => {
            let created = services.role_registry.seed_default_roles().await?;
            Ok(format!("created {created} roles"))
        }
        AdminCommand::Roles => {
            let lines: Vec<String> = services
                .role_registry
                .list_roles()
                .await?
                .iter()
                .map(|role| {
                    let parents: Vec<&str> = role
                        .parents()
                        .iter()
                        .map(|parent| parent.as_str())
                        .collect();
                    if parents.is_empty() {
                        role.name().to_string()
                    } else {
                        format!("{} < {}", role.name(), parents.join(", "))
                    }
                })
                .collect();
            Ok(lines.join("\n"))
        }
        AdminCommand::CreateRole { name, parent } => {
            let role = services
                .role_registry
                .create_role(name.as_str(), parent.as_deref())
                .await?;
            Ok(format!("created role '{}'", role.name()))
        }
        AdminCommand::RemoveRole { name } => {
            let role = services.role_registry.remove_role(name.as_str()).await?;
            Ok(format!("removed role '{}'", role.name()))
        }
        AdminCommand::AddParent { role, parent } => {
            let added = services
                .role_registry
                .add_parent(role.as_str(), parent.as_str())
                .await?;
            Ok(if added {
                format!("'{role}' now sits below '{parent}'")
            } else {
                format!("'{role}' already sits below '{parent}'")
            })
        }
        AdminCommand::RemoveParent { role, parent } => {
            let removed = services
                .role_registry
                .remove_parent(role.as_str(), parent.as_str())
                .await?;
            Ok(if removed {
                format!("'{role}' no longer sits below '{parent}'")
            } else {
                format!("'{role}' did not sit below '{parent}'")
            })
        }
        AdminCommand::Assign { user_id, role } => {
            services
                .assignments
                .assign(&user_id, role.as_str(), None, AssignmentData::new())
                .await?;
            Ok(format!("assigned '{role}' to '{user_id}'"))
        }
        AdminCommand::Unassign { user_id, role } => {
            services
                .assignments
                .unassign(&user_id, role.as_str())
                .await?;
            Ok(format!("unassigned '{role}' from '{user_id}'"))
        }
        AdminCommand::Assignments { user_id } => {
            let assignments = services.assignments.assignments_for(&user_id).await?;
            serde_json::to_string_pretty(&assignments).map_err(|error| {
                AppError::Internal(format!("failed to render assignments: {error}"))
            })
        }
        AdminCommand::AddMember {
            actor,
            project_id,
            user_id,
            role,
        } => {
            services
                .memberships
                .assign_user(&actor, project_id, &user_id, role.as_str())
                .await?;
            Ok(format!(
                "added '{user_id}' to project {project_id} as '{role}'"
            ))
        }
        AdminCommand::RemoveMember {
            actor,
            project_id,
            user_id,
        } => {
            let removed = services
                .memberships
                .remove_user(&actor, project_id, &user_id)
                .await?;
            Ok(format!(
                "removed {removed} rows of '{user_id}' from project {project_id}"
            ))
        }
        AdminCommand::Check {
            user_id,
            permission,
            project_id,
            owner_id,
        } => {
            let context = match project_id {
                Some(project_id) => {
                    services
                        .memberships
                        .project_context(project_id, owner_id)
                        .await?
                }
                None => AccessContext::new(),
            };
            let granted = services
                .access
                .check_access(&user_id, permission.as_str(), &context)
                .await?;
            Ok(if granted { "granted" } else { "denied" }.to_owned())
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests;
