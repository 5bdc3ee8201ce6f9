use std::sync::Arc;

use async_trait::async_trait;
use trackstar_core::{AppError, AppResult, ProjectId};
use trackstar_domain::{
    Assignment, AssignmentData, AuditAction, Predicate, PredicateBlob, RoleName,
};

use crate::test_support::{
    FakeAuditRepository, FakeAuthorizationRepository, FakeProjectMembershipRepository, role, user,
};
use crate::{
    AccessChecker, AssignmentRepository, AssignmentService, AuditRepository, MembershipChange,
    PredicateRegistry,
};

use super::ProjectMembershipService;

struct Fixture {
    service: ProjectMembershipService,
    audit: Arc<FakeAuditRepository>,
    authorization: Arc<FakeAuthorizationRepository>,
}

async fn fixture() -> Fixture {
    fixture_with_audit(None).await
}

async fn fixture_with_audit(audit_override: Option<Arc<dyn AuditRepository>>) -> Fixture {
    let authorization = Arc::new(FakeAuthorizationRepository::with_catalogue().await);
    let assigned = authorization
        .assign(Assignment::new(
            user("root"),
            role("admin"),
            None,
            AssignmentData::new(),
        ))
        .await;
    assert!(matches!(assigned, Ok(true)));

    let predicates = Arc::new(PredicateRegistry::new());
    let audit = Arc::new(FakeAuditRepository::default());
    let audit_repository: Arc<dyn AuditRepository> = match audit_override {
        Some(audit_repository) => audit_repository,
        None => audit.clone(),
    };
    let service = ProjectMembershipService::new(
        authorization.clone(),
        Arc::new(FakeProjectMembershipRepository::default()),
        audit_repository,
        AssignmentService::new(authorization.clone(), predicates.clone()),
        AccessChecker::new(authorization.clone(), authorization.clone(), predicates),
    );

    Fixture {
        service,
        audit,
        authorization,
    }
}

struct UnavailableAuditRepository;

#[async_trait]
impl AuditRepository for UnavailableAuditRepository {
    async fn record_membership_change(&self, _change: MembershipChange) -> AppResult<()> {
        Err(AppError::Internal("audit store unavailable".to_owned()))
    }
}

async fn bind(
    authorization: &FakeAuthorizationRepository,
    user_id: &str,
    role_name: &str,
    predicate: Option<Predicate>,
) {
    let blob = predicate.map(|predicate| match PredicateBlob::encode(&predicate) {
        Ok(blob) => blob,
        Err(error) => panic!("failed to encode predicate: {error}"),
    });
    let assigned = authorization
        .assign(Assignment::new(
            user(user_id),
            role(role_name),
            blob,
            AssignmentData::new(),
        ))
        .await;
    assert!(matches!(assigned, Ok(true)), "assign failed: {assigned:?}");
}

fn as_strs(roles: &[RoleName]) -> Vec<&str> {
    roles.iter().map(RoleName::as_str).collect()
}

#[tokio::test]
async fn only_admins_may_grant_admin() {
    let Fixture { service, .. } = fixture().await;
    let project = ProjectId::new(1);

    assert!(matches!(
        service
            .assign_user(&user("alice"), project, &user("bob"), "admin")
            .await,
        Err(AppError::Forbidden(_))
    ));
    assert!(
        service
            .assign_user(&user("root"), project, &user("bob"), "admin")
            .await
            .is_ok()
    );
    assert!(matches!(
        service.is_user_in_project(project, &user("bob")).await,
        Ok(true)
    ));
}

#[tokio::test]
async fn owners_are_scoped_to_their_project() {
    let Fixture { service, audit, .. } = fixture().await;
    let alice = user("alice");

    assert!(
        service
            .register_project_owner(&alice, ProjectId::new(1))
            .await
            .is_ok()
    );

    assert!(
        service
            .verify_permission(&alice, ProjectId::new(1), None, "updateProject")
            .await
            .is_ok()
    );
    assert!(
        service
            .verify_permission(&alice, ProjectId::new(1), None, "readIssue")
            .await
            .is_ok()
    );
    assert!(matches!(
        service
            .verify_permission(&alice, ProjectId::new(2), None, "updateProject")
            .await,
        Err(AppError::Forbidden(_))
    ));

    let changes = audit.changes.lock().await;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].action, AuditAction::ProjectMemberAdded);
    assert_eq!(changes[0].project_id, ProjectId::new(1));
    assert_eq!(changes[0].role, Some(role("owner")));
}

#[tokio::test]
async fn removing_a_member_revokes_project_access() {
    let Fixture { service, audit, .. } = fixture().await;
    let project = ProjectId::new(3);

    assert!(
        service
            .assign_user(&user("root"), project, &user("carol"), "member")
            .await
            .is_ok()
    );
    assert!(
        service
            .verify_permission(&user("carol"), project, None, "createIssue")
            .await
            .is_ok()
    );

    assert!(matches!(
        service.remove_user(&user("root"), project, &user("carol")).await,
        Ok(1)
    ));
    assert!(matches!(
        service.remove_user(&user("root"), project, &user("carol")).await,
        Ok(0)
    ));
    assert!(matches!(
        service.is_user_in_project(project, &user("carol")).await,
        Ok(false)
    ));
    assert!(matches!(
        service
            .verify_permission(&user("carol"), project, None, "createIssue")
            .await,
        Err(AppError::Forbidden(_))
    ));

    let actions: Vec<AuditAction> = audit
        .changes
        .lock()
        .await
        .iter()
        .map(|change| change.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::ProjectMemberAdded,
            AuditAction::ProjectMemberRemoved
        ]
    );
}

#[tokio::test]
async fn repeated_membership_rows_conflict() {
    let Fixture { service, .. } = fixture().await;
    let project = ProjectId::new(5);

    assert!(
        service
            .assign_user(&user("root"), project, &user("dave"), "reader")
            .await
            .is_ok()
    );
    assert!(matches!(
        service
            .assign_user(&user("root"), project, &user("dave"), "reader")
            .await,
        Err(AppError::Conflict(_))
    ));
    assert!(
        service
            .assign_user(&user("root"), ProjectId::new(6), &user("dave"), "reader")
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn unknown_roles_are_rejected_before_storing_rows() {
    let Fixture { service, .. } = fixture().await;
    let project = ProjectId::new(7);

    assert!(matches!(
        service
            .assign_user(&user("root"), project, &user("erin"), "ghost")
            .await,
        Err(AppError::UnknownRole(_))
    ));
    assert!(matches!(
        service.is_user_in_project(project, &user("erin")).await,
        Ok(false)
    ));
}

#[tokio::test]
async fn role_options_hide_admin_from_non_admins() {
    let Fixture { service, .. } = fixture().await;

    let for_alice = service.role_options(&user("alice")).await.unwrap_or_default();
    assert_eq!(as_strs(&for_alice), vec!["member", "owner", "reader"]);

    let for_root = service.role_options(&user("root")).await.unwrap_or_default();
    assert_eq!(as_strs(&for_root), vec!["admin", "member", "owner", "reader"]);
}

#[tokio::test]
async fn project_context_carries_owner_and_rows() {
    let Fixture { service, .. } = fixture().await;
    let project = ProjectId::new(8);
    assert!(
        service
            .assign_user(&user("root"), project, &user("frank"), "member")
            .await
            .is_ok()
    );

    let context = service.project_context(project, Some(user("grace"))).await;
    let Ok(context) = context else {
        panic!("expected a context: {context:?}");
    };
    let Some(project_context) = context.project() else {
        panic!("expected a project in the context");
    };
    assert_eq!(project_context.project_id(), project);
    assert!(project_context.is_owned_by(&user("grace")));
    assert!(project_context.has_member(&user("frank"), "member"));
}

#[tokio::test]
async fn a_conflicting_binding_blocks_the_membership_row() {
    let Fixture {
        service,
        audit,
        authorization,
    } = fixture().await;
    let project = ProjectId::new(3);
    bind(&authorization, "bob", "member", Some(Predicate::ProjectOwner)).await;

    assert!(matches!(
        service
            .assign_user(&user("root"), project, &user("bob"), "member")
            .await,
        Err(AppError::DuplicateAssignment(_))
    ));
    assert!(matches!(
        service.is_user_in_project(project, &user("bob")).await,
        Ok(false)
    ));
    assert!(audit.changes.lock().await.is_empty());
}

#[tokio::test]
async fn an_unconditional_binding_is_reused() {
    let Fixture {
        service,
        authorization,
        ..
    } = fixture().await;
    let project = ProjectId::new(4);
    bind(&authorization, "bob", "member", None).await;

    assert!(
        service
            .assign_user(&user("root"), project, &user("bob"), "member")
            .await
            .is_ok()
    );
    assert!(matches!(
        service.is_user_in_project(project, &user("bob")).await,
        Ok(true)
    ));
    assert!(
        service
            .verify_permission(&user("bob"), project, None, "createIssue")
            .await
            .is_ok()
    );
    assert_eq!(authorization.assignment_count().await, 2);
}

#[tokio::test]
async fn a_failed_audit_drops_the_membership_row() {
    let Fixture { service, .. } =
        fixture_with_audit(Some(Arc::new(UnavailableAuditRepository))).await;
    let project = ProjectId::new(9);

    assert!(matches!(
        service
            .assign_user(&user("root"), project, &user("heidi"), "reader")
            .await,
        Err(AppError::Internal(_))
    ));
    assert!(matches!(
        service.is_user_in_project(project, &user("heidi")).await,
        Ok(false)
    ));
}
