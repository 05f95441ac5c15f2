#![allow(dead_code)]

use crate::types::{Project, ProjectStatus};

/// Totals and the funding goal are never negative.
pub fn assert_amounts_non_negative(project: &Project) {
    assert!(
        project.amount_repaid >= 0.0,
        "project {} has negative amount_repaid ({})",
        project.id,
        project.amount_repaid
    );
    assert!(
        project.actual_energy >= 0.0,
        "project {} has negative actual_energy ({})",
        project.id,
        project.actual_energy
    );
    assert!(
        project.funding_goal > 0.0,
        "project {} has non-positive funding_goal ({})",
        project.id,
        project.funding_goal
    );
}

/// Drafted and denied projects never carry progress.
pub fn assert_no_progress_before_approval(project: &Project) {
    if matches!(project.status, ProjectStatus::Drafted | ProjectStatus::Denied) {
        assert_eq!(project.amount_repaid, 0.0, "project {} repaid before approval", project.id);
        assert_eq!(project.actual_energy, 0.0, "project {} produced before approval", project.id);
    }
}

/// Only the three lifecycle edges exist:
///   Drafted -> Active | Denied
///   Active  -> Completed
pub fn assert_valid_status_transition(from: ProjectStatus, to: ProjectStatus) {
    let valid = matches!(
        (from, to),
        (ProjectStatus::Drafted, ProjectStatus::Active)
            | (ProjectStatus::Drafted, ProjectStatus::Denied)
            | (ProjectStatus::Active, ProjectStatus::Completed)
    );

    assert!(valid, "invalid status transition from {from:?} to {to:?}");
}

/// Fields fixed at creation stay unchanged.
pub fn assert_project_immutable_fields(original: &Project, current: &Project) {
    assert_eq!(original.id, current.id, "project id changed");
    assert_eq!(original.ambassador, current.ambassador, "project ambassador changed");
    assert_eq!(original.title, current.title, "project title changed");
    assert_eq!(original.category, current.category, "project category changed");
    assert_eq!(original.funding_goal, current.funding_goal, "project funding_goal changed");
    assert_eq!(original.end_date, current.end_date, "project end_date changed");
    assert_eq!(original.org_start_date, current.org_start_date, "project org_start_date changed");
    assert_eq!(original.created_at, current.created_at, "project created_at changed");
}

/// Versions strictly increase across saves.
pub fn assert_version_advanced(before: &Project, after: &Project) {
    assert!(
        after.version > before.version,
        "project {} version did not advance ({} -> {})",
        after.id,
        before.version,
        after.version
    );
}

/// Run all stateless project invariants.
pub fn assert_all_project_invariants(project: &Project) {
    assert_amounts_non_negative(project);
    assert_no_progress_before_approval(project);
}
