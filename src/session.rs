//! Per-view session state handed to the filter and statistics functions

use chrono::{Local, NaiveDate};

use crate::filter::{self, AssignmentType, FilterCriteria};
use crate::models::{Mission, User};
use crate::policy;
use crate::stats::{self, StatSnapshot};

/// Who is looking, what they filtered on, and what day it is
#[derive(Debug, Clone)]
pub struct ViewSession {
    pub viewer: Option<User>,
    pub criteria: FilterCriteria,
    pub today: NaiveDate,
}

impl ViewSession {
    pub fn new(viewer: Option<User>, today: NaiveDate) -> Self {
        Self {
            viewer,
            criteria: FilterCriteria::default(),
            today,
        }
    }

    /// Session dated with the local calendar day
    pub fn starting_today(viewer: Option<User>) -> Self {
        Self::new(viewer, Local::now().date_naive())
    }

    /// Restores every filter to its default, keeping the assignment side
    pub fn reset_filters(&mut self) {
        self.criteria = FilterCriteria::for_assignment(self.criteria.assignment);
    }

    pub fn switch_assignment(&mut self, assignment: AssignmentType) {
        self.criteria.assignment = assignment;
    }

    pub fn visible<'a>(&self, missions: &'a [Mission]) -> Vec<&'a Mission> {
        filter::filter(missions, &self.criteria)
    }

    /// How many missions of the current side the non-default filters hide
    pub fn hidden_by_filters(&self, missions: &[Mission]) -> usize {
        let mut unfiltered = self.clone();
        unfiltered.reset_filters();
        unfiltered
            .visible(missions)
            .len()
            .saturating_sub(self.visible(missions).len())
    }

    /// Snapshot of what the dashboard currently shows
    pub fn visible_stats(&self, missions: &[Mission]) -> StatSnapshot {
        stats::calculate_stats(self.visible(missions), self.today)
    }

    /// Missions the statistics view aggregates for this viewer
    pub fn statistics_scope<'a>(&self, selected: Option<u64>, missions: &'a [Mission]) -> Vec<&'a Mission> {
        policy::statistics_scope(self.viewer.as_ref(), selected, missions)
    }
}
