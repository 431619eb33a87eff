//! Plain-text views printed by the CLI

use chrono::NaiveDate;

use crate::models::{Mission, OrgChart, Profile, Role, User, display_name};
use crate::stats::{HistogramBucket, MonthlyPoint, RadarPoint, StatSnapshot, StatusSlice, UserComparison};

const BAR_WIDTH: usize = 30;

fn date_text(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d.%m.%Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 {
        return String::new();
    }
    let filled = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(filled.min(BAR_WIDTH))
}

/// One-line summary of a mission
pub fn mission_line(mission: &Mission, today: NaiveDate) -> String {
    let mark = if mission.completed { "✅" } else if mission.is_overdue(today) { "⏰" } else { "⬜" };

    let mut line = format!(
        "{mark} #{:<5} {}  ({} → {})",
        mission.id,
        mission.description,
        date_text(mission.assigned_date),
        date_text(mission.end_date)
    );

    if let Some(route) = mission.from_to.as_deref().filter(|r| !r.trim().is_empty()) {
        line.push_str(&format!("  📍 {route}"));
    }

    if !mission.assigned_users.is_empty() {
        let names: Vec<String> = mission.assigned_users.iter().map(User::display_name).collect();
        line.push_str(&format!("  👥 {}", names.join(", ")));
    }

    line
}

pub fn print_missions(title: &str, missions: &[&Mission], today: NaiveDate) {
    println!("{title} ({})", missions.len());
    if missions.is_empty() {
        println!("  No missions.");
    }
    for mission in missions {
        println!("  {}", mission_line(mission, today));
    }
}

pub fn print_mission(mission: &Mission, today: NaiveDate) {
    println!("Mission #{}", mission.id);
    println!("  Description: {}", mission.description);
    println!(
        "  Dates:       {} → {}",
        date_text(mission.assigned_date),
        date_text(mission.end_date)
    );
    if let Some(route) = &mission.from_to {
        println!("  Route:       {route}");
    }
    let status = if mission.completed {
        "completed"
    } else if mission.is_overdue(today) {
        "overdue"
    } else {
        "pending"
    };
    println!("  Status:      {status}");
    println!("  Created by:  {}", display_name(mission.created_by_info.as_ref()));
    for user in &mission.assigned_users {
        println!("  Assignee:    {} ({})", user.display_name(), user.role.label());
    }
    for attachment in &mission.attachments {
        let name = if attachment.file_name.is_empty() {
            &attachment.file
        } else {
            &attachment.file_name
        };
        println!("  Attachment:  {name}  {}", attachment.file);
    }
}

pub fn print_snapshot(title: &str, stats: &StatSnapshot) {
    println!("{title}");
    println!(
        "  Total {}  ·  Completed {}  ·  Pending {}  ·  Overdue {}  ·  Rate {:.1}%",
        stats.total, stats.completed, stats.pending, stats.overdue, stats.completion_rate
    );
}

pub fn print_trend(points: &[MonthlyPoint]) {
    println!("Monthly trend");
    let max = points.iter().map(|p| p.total).max().unwrap_or(0) as f64;
    for p in points {
        println!(
            "  {} {}  {:>3}/{:<3} {:>3}%  {}",
            p.label,
            p.year,
            p.completed,
            p.total,
            p.rate,
            bar(p.total as f64, max)
        );
    }
}

pub fn print_histogram(buckets: &[HistogramBucket]) {
    println!("Completion time");
    let max = buckets.iter().map(|b| b.count).max().unwrap_or(0) as f64;
    for b in buckets {
        println!("  {:<10} {:>3}  {}", b.label, b.count, bar(b.count as f64, max));
    }
}

pub fn print_distribution(slices: &[StatusSlice]) {
    println!("Status distribution");
    let total: usize = slices.iter().map(|s| s.value).sum();
    for s in slices {
        let share = if total == 0 { 0.0 } else { s.value as f64 / total as f64 * 100.0 };
        println!("  {:<11} {:>3}  {:>3.0}%", s.label, s.value, share);
    }
}

pub fn print_radar(points: &[RadarPoint]) {
    println!("Performance");
    for p in points {
        println!("  {:<11} {:>5.1}  {}", p.metric, p.value, bar(p.value, p.full_mark));
    }
}

pub fn print_comparison(rows: &[UserComparison]) {
    println!("User comparison");
    for row in rows {
        println!(
            "  #{:<4} {:<15} completed {:>3}  pending {:>3}  {:>5.1}%",
            row.user_id, row.name, row.completed, row.pending, row.completion_rate
        );
    }
}

/// Lists users, marking those `can_assign` accepts
pub fn print_users(users: &[User], can_assign: impl Fn(Role) -> bool) {
    for user in users {
        let marker = if can_assign(user.role) { "•" } else { " " };
        println!(
            "  {marker} #{:<4} {:<25} {:<9} {}",
            user.id,
            user.display_name(),
            user.role.label(),
            user.unvan.as_deref().unwrap_or("")
        );
    }
}

pub fn print_org_chart(chart: &OrgChart) {
    for (role, users) in chart.tiers() {
        println!("{} ({})", role.label(), users.len());
        for user in users {
            let department = user.department.as_deref().unwrap_or("-");
            println!("  {:<25} {:<20} {}", user.display_name(), department, user.contact());
        }
    }
}

pub fn print_profile(profile: &Profile) {
    let user = &profile.user;
    println!("{}", user.display_name());
    println!("  Username:   {}", user.username);
    println!("  Role:       {}", user.role.label());
    for (label, value) in [
        ("Title", &user.unvan),
        ("Department", &user.department),
        ("Phone", &user.phone),
        ("Email", &user.email),
    ] {
        if let Some(value) = value {
            println!("  {label:<11} {value}");
        }
    }
    let on_off = |flag: bool| if flag { "on" } else { "off" };
    println!(
        "  Notifications: email {}, reminders {}, deadline alerts {}",
        on_off(profile.email_notifications),
        on_off(profile.task_reminders),
        on_off(profile.deadline_alerts)
    );
    if let Some(address) = profile.notification_email.as_deref().or(user.email.as_deref()) {
        println!("  Notify at:     {address}");
    }
}
