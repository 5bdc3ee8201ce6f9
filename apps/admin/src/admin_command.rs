use clap::{Parser, Subcommand};
use trackstar_core::{AppError, AppResult, ProjectId, UserId};

/// Administers TrackStar roles, assignments and project members.
#[derive(Debug, Parser)]
#[command(name = "trackstar-admin", version, about)]
pub struct AdminCli {
    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum AdminCommand {
    /// Apply database migrations
    Migrate,
    /// Install the default role catalogue
    Seed,
    /// List roles and their parents
    Roles,
    /// Create a role
    CreateRole {
        name: String,
        /// Role the new role sits below
        parent: Option<String>,
    },
    /// Remove a role together with its assignments
    RemoveRole { name: String },
    /// Link a role below another role
    AddParent { role: String, parent: String },
    /// Unlink a role from a parent
    RemoveParent { role: String, parent: String },
    /// Assign a role unconditionally
    Assign {
        #[arg(value_parser = parse_user_id)]
        user_id: UserId,
        role: String,
    },
    /// Remove an assignment
    Unassign {
        #[arg(value_parser = parse_user_id)]
        user_id: UserId,
        role: String,
    },
    /// Print a user's assignments as JSON
    Assignments {
        #[arg(value_parser = parse_user_id)]
        user_id: UserId,
    },
    /// Add a user to a project
    AddMember {
        /// User performing the change
        #[arg(value_parser = parse_user_id)]
        actor: UserId,
        #[arg(value_parser = parse_project_id)]
        project_id: ProjectId,
        #[arg(value_parser = parse_user_id)]
        user_id: UserId,
        role: String,
    },
    /// Remove a user from a project
    RemoveMember {
        /// User performing the change
        #[arg(value_parser = parse_user_id)]
        actor: UserId,
        #[arg(value_parser = parse_project_id)]
        project_id: ProjectId,
        #[arg(value_parser = parse_user_id)]
        user_id: UserId,
    },
    /// Evaluate an access check
    Check {
        #[arg(value_parser = parse_user_id)]
        user_id: UserId,
        permission: String,
        /// Check within this project's membership rows
        #[arg(long = "project", value_parser = parse_project_id)]
        project_id: Option<ProjectId>,
        /// Owner of the project being checked
        #[arg(long = "owner", requires = "project_id", value_parser = parse_user_id)]
        owner_id: Option<UserId>,
    },
}

fn parse_user_id(value: &str) -> AppResult<UserId> {
    UserId::new(value)
}

fn parse_project_id(value: &str) -> AppResult<ProjectId> {
    value
        .trim()
        .parse::<i64>()
        .map(ProjectId::new)
        .map_err(|error| AppError::Validation(format!("invalid project id '{value}': {error}")))
}
