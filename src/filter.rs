//! Mission filtering for the dashboard, archive and agenda views
//!
//! All functions are pure and keep input order unless they say otherwise.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::models::Mission;

/// Which side of the assignment the viewer is on.
///
/// Decided by the server's capability flags rather than id matching, since
/// the server also folds role visibility into them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentType {
    /// Missions the viewer can complete
    #[default]
    AssignedToMe,
    /// Missions the viewer can edit
    AssignedByMe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

/// Assignee filter: everyone or one user id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UserSelection {
    #[default]
    All,
    User(u64),
}

impl std::str::FromStr for UserSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(UserSelection::All);
        }
        s.parse()
            .map(UserSelection::User)
            .map_err(|_| format!("expected a user id or 'all', got '{s}'"))
    }
}

/// Dashboard filter state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub assignment: AssignmentType,
    pub status: StatusFilter,
    pub search: String,
    pub selected_user: UserSelection,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl FilterCriteria {
    /// Default criteria for one side of the assignment
    pub fn for_assignment(assignment: AssignmentType) -> Self {
        Self {
            assignment,
            ..Self::default()
        }
    }

    /// Evaluates every predicate in order, stopping at the first miss
    pub fn matches(&self, mission: &Mission) -> bool {
        let assignment = match self.assignment {
            AssignmentType::AssignedToMe => mission.can_complete,
            AssignmentType::AssignedByMe => mission.can_edit,
        };
        if !assignment {
            return false;
        }

        let status = match self.status {
            StatusFilter::All => true,
            StatusFilter::Pending => !mission.completed,
            StatusFilter::Completed => mission.completed,
        };
        if !status {
            return false;
        }

        if !matches_search(mission, &self.search) {
            return false;
        }

        if let UserSelection::User(id) = self.selected_user
            && !mission.is_assigned_to(id)
        {
            return false;
        }

        // Missing or malformed dates never satisfy a bound.
        if let Some(from) = self.date_from
            && !mission.assigned_date.is_some_and(|d| d >= from)
        {
            return false;
        }

        if let Some(to) = self.date_to
            && !mission.end_date.is_some_and(|d| d <= to)
        {
            return false;
        }

        true
    }
}

/// Missions matching `criteria`, in input order
pub fn filter<'a>(missions: &'a [Mission], criteria: &FilterCriteria) -> Vec<&'a Mission> {
    missions.iter().filter(|m| criteria.matches(m)).collect()
}

/// Case-insensitive search over description, route and creator name
fn matches_search(mission: &Mission, search: &str) -> bool {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    let creator = mission
        .created_by_info
        .as_ref()
        .map(|u| u.display_name())
        .unwrap_or_default();

    [
        mission.description.as_str(),
        mission.from_to.as_deref().unwrap_or(""),
        creator.as_str(),
    ]
    .iter()
    .any(|hay| hay.to_lowercase().contains(&needle))
}

/// Completed missions, most recently updated first, optionally searched.
///
/// Archive search also looks at the creator's and assignees' contact
/// addresses. Missions without `updated_at` sort last.
pub fn archive<'a>(missions: &'a [Mission], search: &str) -> Vec<&'a Mission> {
    let needle = search.trim().to_lowercase();

    let mut archived: Vec<&Mission> = missions
        .iter()
        .filter(|m| m.completed)
        .filter(|m| needle.is_empty() || archive_haystack(m).any(|p| p.to_lowercase().contains(&needle)))
        .collect();

    archived.sort_by_key(|m| Reverse(m.updated_at));
    archived
}

fn archive_haystack(mission: &Mission) -> impl Iterator<Item = &str> {
    let creator = mission.created_by_info.iter().flat_map(|u| {
        [u.email.as_deref().unwrap_or(""), u.username.as_str()]
    });

    [mission.description.as_str(), mission.from_to.as_deref().unwrap_or("")]
        .into_iter()
        .chain(creator)
        .chain(mission.assigned_users.iter().map(|u| u.contact()))
}

/// Missions spanning `date`, for the calendar agenda
pub fn active_on(missions: &[Mission], date: NaiveDate) -> Vec<&Mission> {
    missions.iter().filter(|m| m.is_active_on(date)).collect()
}
