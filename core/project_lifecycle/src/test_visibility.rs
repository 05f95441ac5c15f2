use crate::test_support::{project_in, setup, user, ADMIN, AMBASSADOR, DONOR, OTHER_AMBASSADOR};
use crate::{Dashboard, ProjectId, ProjectStatus};

fn ids(projects: &[crate::Project]) -> Vec<ProjectId> {
    projects.iter().map(|p| p.id).collect()
}

#[test]
fn test_ambassador_cant_see_other_ambassadors_projects() {
    let (lifecycle, _) = setup();
    let mine = [
        project_in(&lifecycle, AMBASSADOR, ProjectStatus::Drafted),
        project_in(&lifecycle, AMBASSADOR, ProjectStatus::Active),
    ];
    let theirs = [
        project_in(&lifecycle, OTHER_AMBASSADOR, ProjectStatus::Drafted),
        project_in(&lifecycle, OTHER_AMBASSADOR, ProjectStatus::Active),
        project_in(&lifecycle, OTHER_AMBASSADOR, ProjectStatus::Completed),
    ];

    let visible = lifecycle
        .visible_projects_for(Some(&user(AMBASSADOR)))
        .unwrap();
    assert_eq!(ids(&visible), ids(&mine));
    assert!(visible.iter().all(|p| p.ambassador == user(AMBASSADOR)));

    let visible = lifecycle
        .visible_projects_for(Some(&user(OTHER_AMBASSADOR)))
        .unwrap();
    assert_eq!(ids(&visible), ids(&theirs));
}

#[test]
fn test_administrator_sees_everything_in_id_order() {
    let (lifecycle, _) = setup();
    project_in(&lifecycle, OTHER_AMBASSADOR, ProjectStatus::Denied);
    project_in(&lifecycle, AMBASSADOR, ProjectStatus::Drafted);
    project_in(&lifecycle, ADMIN, ProjectStatus::Completed);

    let visible = lifecycle.visible_projects_for(Some(&user(ADMIN))).unwrap();
    assert_eq!(ids(&visible), vec![ProjectId(1), ProjectId(2), ProjectId(3)]);
}

#[test]
fn test_donors_and_visitors_see_only_public_projects() {
    let (lifecycle, _) = setup();
    project_in(&lifecycle, AMBASSADOR, ProjectStatus::Drafted);
    let active = project_in(&lifecycle, AMBASSADOR, ProjectStatus::Active);
    project_in(&lifecycle, AMBASSADOR, ProjectStatus::Denied);
    let completed = project_in(&lifecycle, OTHER_AMBASSADOR, ProjectStatus::Completed);

    let expected = vec![active.id, completed.id];
    let donor = lifecycle.visible_projects_for(Some(&user(DONOR))).unwrap();
    assert_eq!(ids(&donor), expected);

    let stranger = lifecycle
        .visible_projects_for(Some(&user("stranger")))
        .unwrap();
    assert_eq!(ids(&stranger), expected);

    let anonymous = lifecycle.visible_projects_for(None).unwrap();
    assert_eq!(ids(&anonymous), expected);
}

#[test]
fn test_dashboard_routing_by_role() {
    let (lifecycle, _) = setup();
    assert_eq!(lifecycle.dashboard_for(None), Dashboard::Home);
    assert_eq!(
        lifecycle.dashboard_for(Some(&user(ADMIN))),
        Dashboard::Administrator
    );
    assert_eq!(
        lifecycle.dashboard_for(Some(&user(AMBASSADOR))),
        Dashboard::Ambassador
    );
    assert_eq!(lifecycle.dashboard_for(Some(&user(DONOR))), Dashboard::Donor);
    assert_eq!(lifecycle.dashboard_for(Some(&user("stranger"))).path(), "/");
}

#[test]
fn test_hidden_project_lookup_reports_not_found() {
    let (lifecycle, _) = setup();
    let drafted = project_in(&lifecycle, AMBASSADOR, ProjectStatus::Drafted);
    let active = project_in(&lifecycle, AMBASSADOR, ProjectStatus::Active);

    let owner = user(AMBASSADOR);
    assert_eq!(
        lifecycle.get_visible_project(drafted.id, Some(&owner)).unwrap(),
        drafted
    );
    assert!(lifecycle
        .get_visible_project(drafted.id, Some(&user(ADMIN)))
        .is_ok());

    for outsider in [Some(user(OTHER_AMBASSADOR)), Some(user(DONOR)), None] {
        let err = lifecycle
            .get_visible_project(drafted.id, outsider.as_ref())
            .unwrap_err();
        assert_eq!(err, crate::LifecycleError::NotFound(drafted.id));
    }

    assert!(lifecycle.get_visible_project(active.id, None).is_ok());
    assert!(lifecycle
        .get_visible_project(active.id, Some(&user(OTHER_AMBASSADOR)))
        .is_err());
}
