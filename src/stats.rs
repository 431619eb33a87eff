//! Derived statistics over a set of missions
//!
//! Nothing here mutates its input. "Today" is always passed in so reports are
//! reproducible.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{Mission, User};
use crate::policy::missions_for_user;

/// Missions at or above this count score 100 on activity
pub const ACTIVITY_CAP: f64 = 20.0;
/// Completed missions per average day of duration, scaled to 0..100
pub const PRODUCTIVITY_SCALE: f64 = 20.0;
/// Success points lost per overdue mission
pub const OVERDUE_PENALTY: f64 = 10.0;
/// Length of the monthly trend window, current month included
pub const TREND_MONTHS: i32 = 6;

const MONTH_LABELS: [&str; 12] = [
    "Oca", "Şub", "Mar", "Nis", "May", "Haz", "Tem", "Ağu", "Eyl", "Eki", "Kas", "Ara",
];

/// Completion-time buckets as (label, inclusive upper bound in days)
const DURATION_BUCKETS: [(&str, i64); 5] = [
    ("0-3 gün", 3),
    ("4-7 gün", 7),
    ("8-14 gün", 14),
    ("15-30 gün", 30),
    ("30+ gün", i64::MAX),
];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StatSnapshot {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    /// Percentage with one decimal
    pub completion_rate: f64,
}

pub fn calculate_stats<'a, I>(missions: I, today: NaiveDate) -> StatSnapshot
where
    I: IntoIterator<Item = &'a Mission>,
{
    let mut snapshot = StatSnapshot::default();
    for mission in missions {
        snapshot.total += 1;
        if mission.completed {
            snapshot.completed += 1;
        }
        if mission.is_overdue(today) {
            snapshot.overdue += 1;
        }
    }

    snapshot.pending = snapshot.total - snapshot.completed;
    snapshot.completion_rate = if snapshot.total == 0 {
        0.0
    } else {
        (snapshot.completed as f64 / snapshot.total as f64 * 1000.0).round() / 10.0
    };
    snapshot
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyPoint {
    pub year: i32,
    pub month: u32,
    pub label: &'static str,
    pub completed: usize,
    pub total: usize,
    /// Whole percentage, 0 for empty months
    pub rate: u32,
}

/// Completion counts for the trailing window of months ending at `today`.
///
/// Missions are keyed by their end date; one without an end date counts in
/// the current month.
pub fn monthly_trend<'a, I>(missions: I, today: NaiveDate) -> Vec<MonthlyPoint>
where
    I: IntoIterator<Item = &'a Mission>,
{
    let current = month_index(today);
    let first = current - (TREND_MONTHS - 1);

    let mut points: Vec<MonthlyPoint> = (first..=current)
        .map(|idx| {
            let month0 = idx.rem_euclid(12);
            MonthlyPoint {
                year: idx.div_euclid(12),
                month: month0 as u32 + 1,
                label: MONTH_LABELS[month0 as usize],
                completed: 0,
                total: 0,
                rate: 0,
            }
        })
        .collect();

    for mission in missions {
        let idx = month_index(mission.end_date.unwrap_or(today));
        if idx < first || idx > current {
            continue;
        }
        let point = &mut points[(idx - first) as usize];
        point.total += 1;
        if mission.completed {
            point.completed += 1;
        }
    }

    for point in &mut points {
        if point.total > 0 {
            point.rate = (point.completed as f64 / point.total as f64 * 100.0).round() as u32;
        }
    }
    points
}

fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramBucket {
    pub label: &'static str,
    pub count: usize,
}

/// How long completed missions ran, bucketed by whole days.
///
/// Only completed missions with both dates valid are counted.
pub fn completion_time_histogram<'a, I>(missions: I) -> Vec<HistogramBucket>
where
    I: IntoIterator<Item = &'a Mission>,
{
    let mut buckets: Vec<HistogramBucket> = DURATION_BUCKETS
        .iter()
        .map(|&(label, _)| HistogramBucket { label, count: 0 })
        .collect();

    for days in completed_durations(missions) {
        let slot = DURATION_BUCKETS
            .iter()
            .position(|(_, max)| days <= *max)
            .unwrap_or(DURATION_BUCKETS.len() - 1);
        buckets[slot].count += 1;
    }
    buckets
}

fn completed_durations<'a, I>(missions: I) -> impl Iterator<Item = i64>
where
    I: IntoIterator<Item = &'a Mission>,
{
    missions
        .into_iter()
        .filter(|m| m.completed)
        .filter_map(Mission::duration_days)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserComparison {
    pub user_id: u64,
    /// First word of the display name
    pub name: String,
    pub completed: usize,
    pub pending: usize,
    pub completion_rate: f64,
}

/// Per-user completion figures, best rate first (ties keep input order)
pub fn user_comparison(users: &[User], missions: &[Mission], today: NaiveDate) -> Vec<UserComparison> {
    let mut rows: Vec<UserComparison> = users
        .iter()
        .map(|user| {
            let stats = calculate_stats(missions_for_user(missions, user.id), today);
            let display = user.display_name();
            UserComparison {
                user_id: user.id,
                name: display.split_whitespace().next().unwrap_or(&display).to_string(),
                completed: stats.completed,
                pending: stats.pending,
                completion_rate: stats.completion_rate,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.completion_rate.total_cmp(&a.completion_rate));
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarPoint {
    pub metric: &'static str,
    pub value: f64,
    pub full_mark: f64,
}

/// Five 0..100 scores for the performance radar.
///
/// * Tamamlanma: completion rate
/// * Verimlilik: completed / average duration, scaled by [`PRODUCTIVITY_SCALE`]
/// * Zamanında: share of missions not overdue
/// * Aktiflik: total against [`ACTIVITY_CAP`]
/// * Başarı: 100 minus [`OVERDUE_PENALTY`] per overdue mission
pub fn radar_metrics<'a, I>(missions: I, today: NaiveDate) -> Vec<RadarPoint>
where
    I: IntoIterator<Item = &'a Mission>,
    I::IntoIter: Clone,
{
    let missions = missions.into_iter();
    let stats = calculate_stats(missions.clone(), today);

    let durations: Vec<i64> = completed_durations(missions).collect();
    let avg_days = if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<i64>() as f64 / durations.len() as f64
    };

    let total = stats.total.max(1) as f64;
    let productivity = stats.completed as f64 / avg_days.max(1.0) * PRODUCTIVITY_SCALE;
    let on_time = 100.0 - stats.overdue as f64 / total * 100.0;
    let activity = stats.total as f64 / ACTIVITY_CAP * 100.0;
    let success = 100.0 - stats.overdue as f64 * OVERDUE_PENALTY;

    [
        ("Tamamlanma", stats.completion_rate),
        ("Verimlilik", productivity),
        ("Zamanında", on_time),
        ("Aktiflik", activity),
        ("Başarı", success),
    ]
    .into_iter()
    .map(|(metric, value)| RadarPoint {
        metric,
        value: value.clamp(0.0, 100.0),
        full_mark: 100.0,
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSlice {
    pub label: &'static str,
    pub value: usize,
}

/// Completed / in progress / overdue split, empty slices dropped
pub fn status_distribution<'a, I>(missions: I, today: NaiveDate) -> Vec<StatusSlice>
where
    I: IntoIterator<Item = &'a Mission>,
{
    let stats = calculate_stats(missions, today);
    [
        ("Tamamlanan", stats.completed),
        ("Devam Eden", stats.pending.saturating_sub(stats.overdue)),
        ("Gecikmiş", stats.overdue),
    ]
    .into_iter()
    .filter(|(_, value)| *value > 0)
    .map(|(label, value)| StatusSlice { label, value })
    .collect()
}

/// Stats for missions ending in the current calendar month
pub fn current_month_report(missions: &[Mission], today: NaiveDate) -> StatSnapshot {
    let month = month_index(today);
    calculate_stats(
        missions
            .iter()
            .filter(|m| month_index(m.end_date.unwrap_or(today)) == month),
        today,
    )
}
