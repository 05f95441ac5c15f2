use crate::invariants::{
    assert_all_project_invariants, assert_project_immutable_fields, assert_valid_status_transition,
    assert_version_advanced,
};
use crate::test_support::{
    project_in, sample_draft, setup, user, ADMIN, AMBASSADOR, DONOR, OTHER_AMBASSADOR,
};
use crate::{
    Action, Category, EventKind, LifecycleError, LifecycleEvent, ProjectId, ProjectStatus, Role,
    RoleDirectory,
};

fn assert_invalid_transition(err: LifecycleError, from: ProjectStatus, action: Action) {
    assert_eq!(err, LifecycleError::InvalidTransition { from, action });
}

#[test]
fn test_ambassador_creates_drafted_project() {
    let (lifecycle, sink) = setup();

    let project = lifecycle
        .create_draft(&user(AMBASSADOR), sample_draft())
        .unwrap();

    assert_eq!(project.id, ProjectId(1));
    assert_eq!(project.status, ProjectStatus::Drafted);
    assert_eq!(project.ambassador, user(AMBASSADOR));
    assert_eq!(project.category, Category::Community);
    assert_eq!(project.funding_goal, 50.0);
    assert_eq!(project.amount_repaid, 0.0);
    assert_eq!(project.actual_energy, 0.0);
    assert_eq!(project.version, 1);
    assert_all_project_invariants(&project);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), EventKind::ProjectCreated);
    assert_eq!(events[0].project_id(), project.id);
}

#[test]
fn test_administrator_can_also_create_projects() {
    let (lifecycle, _) = setup();
    let project = lifecycle.create_draft(&user(ADMIN), sample_draft()).unwrap();
    assert_eq!(project.status, ProjectStatus::Drafted);
    assert_eq!(project.ambassador, user(ADMIN));
}

#[test]
fn test_donor_cannot_create_projects() {
    let (lifecycle, sink) = setup();
    let err = lifecycle
        .create_draft(&user(DONOR), sample_draft())
        .unwrap_err();
    assert_eq!(err.code(), "AUTHORIZATION");
    assert!(lifecycle.store().is_empty());
    assert!(sink.events().is_empty());
}

#[test]
fn test_invalid_draft_is_not_stored() {
    let (lifecycle, sink) = setup();
    let mut draft = sample_draft();
    draft.funding_goal = 0.0;

    let err = lifecycle.create_draft(&user(AMBASSADOR), draft).unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Validation {
            field: "funding_goal",
            ..
        }
    ));
    assert!(lifecycle.store().is_empty());
    assert!(sink.events().is_empty());
}

/// Flow: create (goal 50.0) → approve → complete → approve again fails.
#[test]
fn test_full_lifecycle_then_reapprove_fails() {
    let (lifecycle, sink) = setup();
    let admin = user(ADMIN);

    let drafted = lifecycle
        .create_draft(&user(AMBASSADOR), sample_draft())
        .unwrap();
    assert_eq!(drafted.funding_goal, 50.0);
    assert_eq!(drafted.status, ProjectStatus::Drafted);

    let active = lifecycle.approve(drafted.id, &admin).unwrap();
    assert_eq!(active.status, ProjectStatus::Active);
    assert_version_advanced(&drafted, &active);
    assert_project_immutable_fields(&drafted, &active);

    let completed = lifecycle.complete(drafted.id, &admin).unwrap();
    assert_eq!(completed.status, ProjectStatus::Completed);
    assert_project_immutable_fields(&drafted, &completed);

    let err = lifecycle.approve(drafted.id, &admin).unwrap_err();
    assert_invalid_transition(err, ProjectStatus::Completed, Action::Approve);
    assert_eq!(
        lifecycle.get_project(drafted.id).unwrap().status,
        ProjectStatus::Completed
    );

    let changes = sink.status_changes();
    assert_eq!(
        changes,
        vec![
            (drafted.id, ProjectStatus::Drafted, ProjectStatus::Active),
            (drafted.id, ProjectStatus::Active, ProjectStatus::Completed),
        ]
    );
    for (_, from, to) in changes {
        assert_valid_status_transition(from, to);
    }
}

#[test]
fn test_ambassador_cannot_approve_own_project() {
    let (lifecycle, sink) = setup();
    let ambassador = user(AMBASSADOR);
    let project = project_in(&lifecycle, AMBASSADOR, ProjectStatus::Drafted);

    let err = lifecycle.approve(project.id, &ambassador).unwrap_err();
    assert!(matches!(err, LifecycleError::Authorization { .. }));
    assert_eq!(
        lifecycle.get_project(project.id).unwrap().status,
        ProjectStatus::Drafted
    );
    assert!(sink.status_changes().is_empty());
}

#[test]
fn test_non_administrators_rejected_in_every_state() {
    let (lifecycle, _) = setup();
    let projects = [
        project_in(&lifecycle, AMBASSADOR, ProjectStatus::Drafted),
        project_in(&lifecycle, AMBASSADOR, ProjectStatus::Active),
        project_in(&lifecycle, AMBASSADOR, ProjectStatus::Completed),
        project_in(&lifecycle, AMBASSADOR, ProjectStatus::Denied),
    ];

    for actor in [AMBASSADOR, OTHER_AMBASSADOR, DONOR, "stranger"] {
        let actor = user(actor);
        for project in &projects {
            for result in [
                lifecycle.approve(project.id, &actor),
                lifecycle.deny(project.id, &actor),
                lifecycle.complete(project.id, &actor),
            ] {
                assert_eq!(result.unwrap_err().code(), "AUTHORIZATION");
            }
        }
    }
}

#[test]
fn test_non_administrator_on_missing_project_is_still_unauthorized() {
    let (lifecycle, _) = setup();
    let err = lifecycle
        .approve(ProjectId(404), &user(AMBASSADOR))
        .unwrap_err();
    assert_eq!(err.code(), "AUTHORIZATION");

    let err = lifecycle.approve(ProjectId(404), &user(ADMIN)).unwrap_err();
    assert_eq!(err, LifecycleError::NotFound(ProjectId(404)));
}

#[test]
fn test_admin_can_deny_drafted_project() {
    let (lifecycle, sink) = setup();
    let admin = user(ADMIN);
    let project = project_in(&lifecycle, AMBASSADOR, ProjectStatus::Drafted);

    let denied = lifecycle.deny(project.id, &admin).unwrap();
    assert_eq!(denied.status, ProjectStatus::Denied);

    match sink.events().last() {
        Some(LifecycleEvent::StatusChanged(change)) => {
            assert_eq!(change.old_status, ProjectStatus::Drafted);
            assert_eq!(change.new_status, ProjectStatus::Denied);
            assert_eq!(change.actor, admin);
            assert_eq!(change.project, denied);
        }
        other => panic!("expected a status change event, got {other:?}"),
    }
}

#[test]
fn test_denied_project_is_terminal() {
    let (lifecycle, _) = setup();
    let admin = user(ADMIN);
    let project = project_in(&lifecycle, AMBASSADOR, ProjectStatus::Denied);

    assert_invalid_transition(
        lifecycle.approve(project.id, &admin).unwrap_err(),
        ProjectStatus::Denied,
        Action::Approve,
    );
    assert_invalid_transition(
        lifecycle.deny(project.id, &admin).unwrap_err(),
        ProjectStatus::Denied,
        Action::Deny,
    );
    assert_invalid_transition(
        lifecycle.complete(project.id, &admin).unwrap_err(),
        ProjectStatus::Denied,
        Action::Complete,
    );
    assert_invalid_transition(
        lifecycle
            .record_update(project.id, &admin, 1.0, 1.0)
            .unwrap_err(),
        ProjectStatus::Denied,
        Action::RecordUpdate,
    );
}

#[test]
fn test_drafted_project_cannot_be_completed() {
    let (lifecycle, _) = setup();
    let project = project_in(&lifecycle, AMBASSADOR, ProjectStatus::Drafted);
    assert_invalid_transition(
        lifecycle.complete(project.id, &user(ADMIN)).unwrap_err(),
        ProjectStatus::Drafted,
        Action::Complete,
    );
}

#[test]
fn test_active_project_cannot_be_denied_or_reapproved() {
    let (lifecycle, _) = setup();
    let admin = user(ADMIN);
    let project = project_in(&lifecycle, AMBASSADOR, ProjectStatus::Active);

    assert_invalid_transition(
        lifecycle.deny(project.id, &admin).unwrap_err(),
        ProjectStatus::Active,
        Action::Deny,
    );
    assert_invalid_transition(
        lifecycle.approve(project.id, &admin).unwrap_err(),
        ProjectStatus::Active,
        Action::Approve,
    );
}

#[test]
fn test_post_updates_for_active_and_completed_projects() {
    let (lifecycle, sink) = setup();
    let owner = user(AMBASSADOR);
    let admin = user(ADMIN);

    let active = project_in(&lifecycle, AMBASSADOR, ProjectStatus::Active);
    let updated = lifecycle
        .record_update(active.id, &owner, 29.25, 25.5)
        .unwrap();
    assert_eq!(updated.amount_repaid, 29.25);
    assert_eq!(updated.actual_energy, 25.5);
    assert_eq!(updated.status, ProjectStatus::Active);

    let completed = project_in(&lifecycle, AMBASSADOR, ProjectStatus::Completed);
    let updated = lifecycle
        .record_update(completed.id, &admin, 10.0, 0.0)
        .unwrap();
    assert_eq!(updated.amount_repaid, 10.0);
    assert_eq!(updated.status, ProjectStatus::Completed);

    let progress: Vec<_> = sink
        .events()
        .into_iter()
        .filter(|e| e.kind() == EventKind::ProgressRecorded)
        .collect();
    assert_eq!(progress.len(), 2);
    assert_eq!(progress[0].actor(), &owner);
}

#[test]
fn test_updates_rejected_for_drafted_project() {
    let (lifecycle, _) = setup();
    let project = project_in(&lifecycle, AMBASSADOR, ProjectStatus::Drafted);
    assert_invalid_transition(
        lifecycle
            .record_update(project.id, &user(AMBASSADOR), 5.0, 5.0)
            .unwrap_err(),
        ProjectStatus::Drafted,
        Action::RecordUpdate,
    );
}

#[test]
fn test_updates_require_owner_or_administrator() {
    let (lifecycle, _) = setup();
    let project = project_in(&lifecycle, AMBASSADOR, ProjectStatus::Active);

    for outsider in [OTHER_AMBASSADOR, DONOR, "stranger"] {
        let err = lifecycle
            .record_update(project.id, &user(outsider), 1.0, 1.0)
            .unwrap_err();
        assert_eq!(err.code(), "AUTHORIZATION");
    }
    assert_eq!(lifecycle.get_project(project.id).unwrap().amount_repaid, 0.0);
}

#[test]
fn test_owner_demoted_to_donor_loses_update_rights() {
    let (lifecycle, _) = setup();
    let project = project_in(&lifecycle, AMBASSADOR, ProjectStatus::Active);
    lifecycle
        .roles()
        .assign(&user(ADMIN), user(AMBASSADOR), Role::Donor)
        .unwrap();
    assert!(lifecycle.roles().has_role(&user(AMBASSADOR), Role::Donor));

    let err = lifecycle
        .record_update(project.id, &user(AMBASSADOR), 1.0, 1.0)
        .unwrap_err();
    assert_eq!(err.code(), "AUTHORIZATION");
}

#[test]
fn test_update_that_would_go_negative_writes_nothing() {
    let (lifecycle, sink) = setup();
    let owner = user(AMBASSADOR);
    let project = project_in(&lifecycle, AMBASSADOR, ProjectStatus::Active);
    let before = lifecycle.record_update(project.id, &owner, 5.0, 2.0).unwrap();
    let events_before = sink.events().len();

    let err = lifecycle
        .record_update(project.id, &owner, -5.5, 0.0)
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Validation {
            field: "amount_repaid",
            ..
        }
    ));

    let after = lifecycle.get_project(project.id).unwrap();
    assert_eq!(after, before);
    assert_eq!(sink.events().len(), events_before);

    let corrected = lifecycle.record_update(project.id, &owner, -5.0, -2.0).unwrap();
    assert_eq!(corrected.amount_repaid, 0.0);
    assert_eq!(corrected.actual_energy, 0.0);
}
