//! Attribute checks for drafts and progress updates.

use chrono::NaiveDate;

use crate::errors::{LifecycleError, Result};
use crate::types::{Category, Project, ProjectDraft};

fn require_text(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LifecycleError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn require_non_negative(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(LifecycleError::validation(
            field,
            format!("must be a non-negative number, got {value}"),
        ));
    }
    Ok(())
}

fn require_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(LifecycleError::validation(
            field,
            format!("must be between {min} and {max}, got {value}"),
        ));
    }
    Ok(())
}

/// Checks a draft against `today` and returns its parsed category.
pub fn validate_draft(draft: &ProjectDraft, today: NaiveDate) -> Result<Category> {
    require_text("title", &draft.title)?;
    require_text("tagline", &draft.tagline)?;
    require_text("mission_statement", &draft.mission_statement)?;
    require_text("org_about", &draft.org_about)?;

    if !draft.funding_goal.is_finite() || draft.funding_goal <= 0.0 {
        return Err(LifecycleError::validation(
            "funding_goal",
            format!("must be greater than zero, got {}", draft.funding_goal),
        ));
    }

    if draft.end_date <= today {
        return Err(LifecycleError::validation(
            "end_date",
            format!("must be after {today}, got {}", draft.end_date),
        ));
    }

    let category = draft
        .category
        .parse::<Category>()
        .map_err(|e| LifecycleError::validation("category", e))?;

    if let Some(power) = draft.impact_power {
        require_non_negative("impact_power", power)?;
    }
    if let Some(lat) = draft.location_latitude {
        require_range("location_latitude", lat, -90.0, 90.0)?;
    }
    if let Some(lon) = draft.location_longitude {
        require_range("location_longitude", lon, -180.0, 180.0)?;
    }

    Ok(category)
}

/// Applies progress deltas to `project`'s totals and returns the new
/// `(amount_repaid, actual_energy)`. Neither total may go negative.
pub fn apply_progress(
    project: &Project,
    amount_repaid_delta: f64,
    energy_delta: f64,
) -> Result<(f64, f64)> {
    if !amount_repaid_delta.is_finite() {
        return Err(LifecycleError::validation("amount_repaid", "delta must be finite"));
    }
    if !energy_delta.is_finite() {
        return Err(LifecycleError::validation("actual_energy", "delta must be finite"));
    }

    let amount_repaid = project.amount_repaid + amount_repaid_delta;
    let actual_energy = project.actual_energy + energy_delta;
    require_non_negative("amount_repaid", amount_repaid)?;
    require_non_negative("actual_energy", actual_energy)?;
    Ok((amount_repaid, actual_energy))
}
