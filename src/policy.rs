//! Role-based visibility and assignment rules
//!
//! Every role check lives here so the views never branch on role names.

use crate::models::{Mission, Role, User};

/// CEO sees every user in reports
pub fn can_view_all_users(role: Role) -> bool {
    matches!(role, Role::Ceo)
}

/// CEO and managers see per-employee comparisons
pub fn can_view_employees(role: Role) -> bool {
    matches!(role, Role::Ceo | Role::Manager)
}

/// Whether `role` may hand missions to someone holding `target`
pub fn can_assign_to(role: Role, target: Role) -> bool {
    match role {
        Role::Ceo => true,
        Role::Manager => matches!(target, Role::Employee),
        Role::Employee => false,
    }
}

/// Users whose reports `viewer` may open
pub fn visible_users<'a>(viewer: &'a User, users: &'a [User]) -> Vec<&'a User> {
    if can_view_all_users(viewer.role) {
        users.iter().collect()
    } else if can_view_employees(viewer.role) {
        users.iter().filter(|u| u.role == Role::Employee).collect()
    } else {
        vec![viewer]
    }
}

/// Missions where `user_id` is an assignee or the creator
pub fn missions_for_user(missions: &[Mission], user_id: u64) -> Vec<&Mission> {
    missions
        .iter()
        .filter(|m| m.is_assigned_to(user_id) || m.is_created_by(user_id))
        .collect()
}

/// Missions a statistics view should aggregate.
///
/// An explicitly selected user wins; otherwise employees only ever see their
/// own missions and everyone else sees the whole set.
pub fn statistics_scope<'a>(
    viewer: Option<&User>,
    selected: Option<u64>,
    missions: &'a [Mission],
) -> Vec<&'a Mission> {
    match (selected, viewer) {
        (Some(id), _) => missions_for_user(missions, id),
        (None, Some(v)) if v.role == Role::Employee => missions_for_user(missions, v.id),
        _ => missions.iter().collect(),
    }
}
