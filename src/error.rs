//! Error types for mission-desk

use std::collections::BTreeMap;
use std::fmt;

/// One field-level complaint from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub messages: Vec<String>,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.messages.join(", "))
    }
}

/// Parses a DRF-style error body: `{"field": ["msg", ...], "detail": "msg"}`.
///
/// Fields keep the order the server sent them in. Returns an empty list when
/// the body is not a JSON object.
pub fn parse_field_errors(body: &str) -> Vec<FieldError> {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) else {
        return Vec::new();
    };

    map.into_iter()
        .map(|(field, value)| {
            let messages = match value {
                serde_json::Value::Array(items) => items.iter().map(value_text).collect(),
                other => vec![value_text(&other)],
            };
            FieldError { field, messages }
        })
        .collect()
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Failures talking to the mission API
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Connection, timeout or body transfer failed.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The bearer token was missing, expired or rejected.
    #[error("not authorized; check auth.access_token in the config")]
    Unauthorized,

    /// The server refused a mission create or update with field-level errors.
    #[error("server rejected the request ({status})")]
    Rejected { status: u16, fields: Vec<FieldError> },

    /// Any other non-success answer.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Reading an attachment from disk failed.
    #[error("cannot read attachment {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Draft fields in the order the form shows them
const FORM_FIELDS: [&str; 4] = ["description", "assigned_date", "end_date", "due_to"];

/// Client-side draft problems, keyed by field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub BTreeMap<&'static str, String>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub(crate) fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }
}

impl fmt::Display for ValidationErrors {
    /// One line per field, in form order
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known = FORM_FIELDS
            .iter()
            .filter_map(|field| self.get(field).map(|message| (*field, message)));
        let others = self
            .0
            .iter()
            .filter(|(field, _)| !FORM_FIELDS.contains(field))
            .map(|(field, message)| (*field, message.as_str()));

        let lines: Vec<String> = known
            .chain(others)
            .map(|(field, message)| format!("{field}: {message}"))
            .collect();
        f.write_str(&lines.join("\n"))
    }
}

/// Everything a view can surface to the user
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("invalid mission draft:\n{0}")]
    Validation(ValidationErrors),

    /// The server settled the mission differently from what the client assumed.
    #[error("mission {mission_id} is {} on the server", state_word(.server_completed))]
    Conflict { mission_id: u64, server_completed: bool },

    /// A change on this mission is still in flight.
    #[error("mission {mission_id} is already being updated")]
    Busy { mission_id: u64 },

    #[error("no mission with id {0}")]
    UnknownMission(u64),

    #[error("optimistic update is no longer pending")]
    UnknownToken,
}

fn state_word(completed: &bool) -> &'static str {
    if *completed { "completed" } else { "pending" }
}

pub type DeskResult<T> = Result<T, DeskError>;

impl DeskError {
    /// Consolidated message for the user, with one line per server field error
    pub fn notice(&self) -> String {
        match self {
            DeskError::Gateway(GatewayError::Rejected { fields, .. }) if !fields.is_empty() => {
                let details: Vec<String> = fields.iter().map(ToString::to_string).collect();
                format!("The server rejected the mission.\n\n{}", details.join("\n"))
            }
            DeskError::Conflict { .. } => {
                format!("{self}; the local change was rolled back")
            }
            other => other.to_string(),
        }
    }
}
