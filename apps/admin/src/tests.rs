use clap::Parser;
use trackstar_core::AppError;

use crate::admin_command::AdminCli;
use crate::admin_services::AdminServices;
use crate::execute;

async fn run(services: &AdminServices, args: &[&str]) -> Result<String, AppError> {
    let cli = match AdminCli::try_parse_from(
        std::iter::once("trackstar-admin").chain(args.iter().copied()),
    ) {
        Ok(cli) => cli,
        Err(error) => panic!("invalid command {args:?}: {error}"),
    };
    execute(cli.command, services).await
}

async fn seeded() -> AdminServices {
    let services = AdminServices::in_memory();
    let seeded = run(&services, &["seed"]).await;
    assert!(matches!(seeded, Ok(ref output) if output.starts_with("created ")));
    services
}

#[tokio::test]
async fn seeded_catalogue_is_listed_with_parents() {
    let services = seeded().await;

    let output = run(&services, &["roles"]).await.unwrap_or_default();
    let lines: Vec<&str> = output.lines().collect();
    assert!(lines.contains(&"admin"));
    assert!(lines.contains(&"owner < admin"));
    assert!(lines.contains(&"readIssue < reader"));
}

#[tokio::test]
async fn unconditional_assignment_flows_through_check() {
    let services = seeded().await;

    assert!(run(&services, &["assign", "alice", "member"]).await.is_ok());
    assert_eq!(
        run(&services, &["check", "alice", "createIssue"])
            .await
            .unwrap_or_default(),
        "granted"
    );
    assert_eq!(
        run(&services, &["check", "alice", "deleteProject"])
            .await
            .unwrap_or_default(),
        "denied"
    );

    let listed = run(&services, &["assignments", "alice"])
        .await
        .unwrap_or_default();
    let parsed: serde_json::Value = serde_json::from_str(&listed).unwrap_or_default();
    assert_eq!(parsed[0]["role_name"], "member");

    assert!(run(&services, &["unassign", "alice", "member"]).await.is_ok());
    assert_eq!(
        run(&services, &["check", "alice", "createIssue"])
            .await
            .unwrap_or_default(),
        "denied"
    );
}

#[tokio::test]
async fn project_members_are_checked_against_their_project() {
    let services = seeded().await;

    assert!(
        run(&services, &["add-member", "root", "7", "bob", "member"])
            .await
            .is_ok()
    );
    assert!(matches!(
        run(&services, &["add-member", "root", "7", "eve", "admin"]).await,
        Err(AppError::Forbidden(_))
    ));

    assert_eq!(
        run(&services, &["check", "bob", "updateIssue", "--project", "7"])
            .await
            .unwrap_or_default(),
        "granted"
    );
    assert_eq!(
        run(&services, &["check", "bob", "updateIssue", "--project", "8"])
            .await
            .unwrap_or_default(),
        "denied"
    );
    assert_eq!(
        run(&services, &["check", "bob", "updateIssue"])
            .await
            .unwrap_or_default(),
        "denied"
    );

    assert!(
        run(&services, &["remove-member", "root", "7", "bob"])
            .await
            .is_ok()
    );
    assert_eq!(
        run(&services, &["check", "bob", "updateIssue", "--project", "7"])
            .await
            .unwrap_or_default(),
        "denied"
    );
}

#[tokio::test]
async fn role_errors_surface_from_commands() {
    let services = seeded().await;

    assert!(matches!(
        run(&services, &["create-role", "owner"]).await,
        Err(AppError::DuplicateRole(_))
    ));
    assert!(matches!(
        run(&services, &["create-role", "auditor", "ghost"]).await,
        Err(AppError::UnknownParent(_))
    ));
    assert!(matches!(
        run(&services, &["add-parent", "admin", "reader"]).await,
        Err(AppError::Cycle(_))
    ));
    assert!(matches!(
        run(&services, &["assign", "alice", "ghost"]).await,
        Err(AppError::UnknownRole(_))
    ));
    assert!(run(&services, &["remove-role", "reader"]).await.is_ok());
    assert!(matches!(
        run(&services, &["remove-role", "reader"]).await,
        Err(AppError::UnknownRole(_))
    ));
}
