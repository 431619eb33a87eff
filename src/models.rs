//! Mission and user records as served by the mission API
//!
//! Dates travel as `YYYY-MM-DD` strings. Anything that does not parse becomes
//! `None`, so one malformed record never fails a whole listing and every date
//! predicate downstream can treat `None` as "does not match".

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Placeholder shown when a user has no usable name at all
pub const UNNAMED: &str = "İsimsiz";

/// Organisation role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Ceo,
    Manager,
    #[default]
    Employee,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Ceo, Role::Manager, Role::Employee];

    /// Wire name, as used for org chart keys
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Ceo => "CEO",
            Role::Manager => "MANAGER",
            Role::Employee => "EMPLOYEE",
        }
    }

    /// Localized label
    pub fn label(self) -> &'static str {
        match self {
            Role::Ceo => "CEO",
            Role::Manager => "Yönetici",
            Role::Employee => "Çalışan",
        }
    }
}

/// A user, read-only reference data from this client's point of view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Job title
    #[serde(default)]
    pub unvan: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl User {
    /// Name used everywhere a user is shown, searched or attributed.
    ///
    /// Falls back from `full_name` to `"first last"` to `username`, and
    /// finally to [`UNNAMED`].
    pub fn display_name(&self) -> String {
        if let Some(full) = non_blank(self.full_name.as_deref()) {
            return full.to_string();
        }

        let joined = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let joined = joined.trim();
        if !joined.is_empty() {
            return joined.to_string();
        }

        non_blank(Some(&self.username))
            .unwrap_or(UNNAMED)
            .to_string()
    }

    /// Email if present, username otherwise
    pub fn contact(&self) -> &str {
        non_blank(self.email.as_deref()).unwrap_or(&self.username)
    }
}

/// [`User::display_name`] for an optional user
pub fn display_name(user: Option<&User>) -> String {
    user.map(User::display_name)
        .unwrap_or_else(|| UNNAMED.to_string())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// A file attached to a mission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: u64,
    /// Download URI
    pub file: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub file_name: String,
}

/// A mission (task) assigned to one or more users over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub assigned_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub from_to: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub assigned_users: Vec<User>,
    #[serde(default)]
    pub created_by_info: Option<User>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Viewer may toggle completion (viewer is an assignee)
    #[serde(default)]
    pub can_complete: bool,
    /// Viewer may edit (viewer created it)
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Set while an optimistic change awaits the server; never sent or stored
    #[serde(skip)]
    pub is_updating: bool,
}

impl Mission {
    pub fn is_assigned_to(&self, user_id: u64) -> bool {
        self.assigned_users.iter().any(|u| u.id == user_id)
    }

    pub fn is_created_by(&self, user_id: u64) -> bool {
        self.created_by_info.as_ref().is_some_and(|u| u.id == user_id)
    }

    /// Still open and past its end date. The end day itself is not overdue.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.end_date.is_some_and(|end| end < today)
    }

    /// Whole days between assignment and end, if both dates are valid
    pub fn duration_days(&self) -> Option<i64> {
        match (self.assigned_date, self.end_date) {
            (Some(start), Some(end)) => Some((end - start).num_days()),
            _ => None,
        }
    }

    /// Whether the mission spans `date` (both ends inclusive)
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        match (self.assigned_date, self.end_date) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        }
    }
}

/// A list response, either bare or wrapped in a pagination envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Page { results: Vec<T> },
}

impl<T> Listing<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Listing::Bare(items) => items,
            Listing::Page { results } => results,
        }
    }
}

/// Assignable users, either a flat list or grouped by role
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AssignableUsers {
    List(Vec<User>),
    ByRole(BTreeMap<String, Vec<User>>),
}

impl AssignableUsers {
    /// Flattens the grouped shape, known roles first in rank order
    pub fn flatten(self) -> Vec<User> {
        match self {
            AssignableUsers::List(users) => users,
            AssignableUsers::ByRole(mut groups) => {
                let mut users = Vec::new();
                for role in Role::ALL {
                    if let Some(group) = groups.remove(role.as_str()) {
                        users.extend(group);
                    }
                }
                users.extend(groups.into_values().flatten());
                users
            }
        }
    }
}

/// All users partitioned by role tier
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgChart {
    #[serde(rename = "CEO", default)]
    pub ceo: Vec<User>,
    #[serde(rename = "MANAGER", default)]
    pub managers: Vec<User>,
    #[serde(rename = "EMPLOYEE", default)]
    pub employees: Vec<User>,
}

impl OrgChart {
    /// Tiers from the top down
    pub fn tiers(&self) -> [(Role, &[User]); 3] {
        [
            (Role::Ceo, self.ceo.as_slice()),
            (Role::Manager, self.managers.as_slice()),
            (Role::Employee, self.employees.as_slice()),
        ]
    }
}

/// The signed-in user's own record
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    #[serde(default = "default_true")]
    pub email_notifications: bool,
    #[serde(default = "default_true")]
    pub task_reminders: bool,
    #[serde(default = "default_true")]
    pub deadline_alerts: bool,
    #[serde(default)]
    pub notification_email: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Parses a date, ignoring any time part after the first ten characters
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse_date))
}

fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn display_name_fallback_chain() {
        let mut u = user(1, "ayse", Role::Employee);
        assert_eq!(u.display_name(), "ayse");

        u.first_name = Some("Ayşe".into());
        assert_eq!(u.display_name(), "Ayşe");

        u.last_name = Some("Yılmaz".into());
        assert_eq!(u.display_name(), "Ayşe Yılmaz");

        u.full_name = Some("Dr. Ayşe Yılmaz".into());
        assert_eq!(u.display_name(), "Dr. Ayşe Yılmaz");

        let blank = User {
            username: String::new(),
            ..user(2, "", Role::Employee)
        };
        assert_eq!(blank.display_name(), UNNAMED);
        assert_eq!(display_name(None), UNNAMED);
    }

    #[test]
    fn malformed_dates_become_none() {
        let m: Mission = serde_json::from_value(serde_json::json!({
            "id": 7,
            "description": null,
            "assigned_date": "not-a-date",
            "end_date": "2024-03-05T09:30:00Z",
            "completed": false
        }))
        .unwrap();

        assert_eq!(m.description, "");
        assert_eq!(m.assigned_date, None);
        assert_eq!(m.end_date, Some(date("2024-03-05")));
        assert!(!m.is_updating);
    }

    #[test]
    fn listing_accepts_both_shapes() {
        let bare: Listing<Mission> =
            serde_json::from_str(r#"[{"id": 1}, {"id": 2}]"#).unwrap();
        assert_eq!(bare.into_items().len(), 2);

        let page: Listing<Mission> =
            serde_json::from_str(r#"{"count": 1, "results": [{"id": 3}]}"#).unwrap();
        let items = page.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 3);

        let empty: Listing<Mission> = serde_json::from_str("[]").unwrap();
        assert!(empty.into_items().is_empty());
    }

    #[test]
    fn assignable_users_flatten_by_role_rank() {
        let grouped: AssignableUsers = serde_json::from_str(
            r#"{
                "EMPLOYEE": [{"id": 3, "username": "emp", "role": "EMPLOYEE"}],
                "MANAGER": [{"id": 2, "username": "mgr", "role": "MANAGER"}]
            }"#,
        )
        .unwrap();
        let ids: Vec<u64> = grouped.flatten().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn overdue_requires_open_and_past_end() {
        let today = date("2024-06-10");
        assert!(mission(1, "2024-06-01", "2024-06-09", false).is_overdue(today));
        assert!(!mission(2, "2024-06-01", "2024-06-10", false).is_overdue(today));
        assert!(!mission(3, "2024-06-01", "2024-06-09", true).is_overdue(today));
        assert!(!mission(4, "2024-06-01", "garbage", false).is_overdue(today));
    }
}
