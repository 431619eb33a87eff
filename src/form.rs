//! Mission create/edit form state and submission

use chrono::NaiveDate;
use std::path::PathBuf;

use crate::error::{DeskError, DeskResult, ValidationErrors};
use crate::gateway::{Gateway, MissionPayload};
use crate::models::Mission;

/// Editable fields of a mission
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissionDraft {
    pub description: String,
    pub assigned_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub from_to: String,
    /// Selected assignee ids, in selection order
    pub due_to: Vec<u64>,
    /// New files to upload; existing attachments are kept server-side
    pub attachments: Vec<PathBuf>,
}

impl MissionDraft {
    /// Draft pre-filled from an existing mission, without attachments
    pub fn from_mission(mission: &Mission) -> Self {
        Self {
            description: mission.description.clone(),
            assigned_date: mission.assigned_date,
            end_date: mission.end_date,
            from_to: mission.from_to.clone().unwrap_or_default(),
            due_to: mission.assigned_users.iter().map(|u| u.id).collect(),
            attachments: Vec::new(),
        }
    }

    /// Selects the user, or deselects them if already selected
    pub fn toggle_user(&mut self, user_id: u64) {
        if let Some(pos) = self.due_to.iter().position(|id| *id == user_id) {
            self.due_to.remove(pos);
        } else {
            self.due_to.push(user_id);
        }
    }

    pub fn add_attachment(&mut self, path: impl Into<PathBuf>) {
        self.attachments.push(path.into());
    }

    pub fn remove_attachment(&mut self, index: usize) -> Option<PathBuf> {
        (index < self.attachments.len()).then(|| self.attachments.remove(index))
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Field-keyed problems; empty when the draft can be sent
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::default();

        if self.description.trim().is_empty() {
            errors.insert("description", "description is required");
        }

        match (self.assigned_date, self.end_date) {
            (Some(start), Some(end)) if end < start => {
                errors.insert("end_date", "end date cannot be before the start date");
            }
            (start, end) => {
                if start.is_none() {
                    errors.insert("assigned_date", "start date is required");
                }
                if end.is_none() {
                    errors.insert("end_date", "end date is required");
                }
            }
        }

        if self.due_to.is_empty() {
            errors.insert("due_to", "select at least one assignee");
        }

        errors
    }

    fn payload(&self) -> DeskResult<MissionPayload> {
        let errors = self.validate();
        let (Some(assigned_date), Some(end_date)) = (self.assigned_date, self.end_date) else {
            return Err(DeskError::Validation(errors));
        };
        if !errors.is_empty() {
            return Err(DeskError::Validation(errors));
        }

        let route = self.from_to.trim();
        Ok(MissionPayload {
            description: self.description.clone(),
            assigned_date,
            end_date,
            from_to: (!route.is_empty()).then(|| route.to_string()),
            due_to: self.due_to.clone(),
            attachments: self.attachments.clone(),
        })
    }
}

/// A draft plus the mission it edits, if any
#[derive(Debug, Clone, Default)]
pub struct MissionForm {
    pub draft: MissionDraft,
    editing: Option<u64>,
}

impl MissionForm {
    /// Empty form for a new mission
    pub fn create() -> Self {
        Self::default()
    }

    /// Form editing `mission`
    pub fn edit(mission: &Mission) -> Self {
        Self {
            draft: MissionDraft::from_mission(mission),
            editing: Some(mission.id),
        }
    }

    pub fn editing(&self) -> Option<u64> {
        self.editing
    }

    /// Validates and sends the draft.
    ///
    /// Invalid drafts never reach the gateway. Edits go out as partial
    /// updates. On success the draft is cleared and the saved mission returned.
    pub async fn submit(&mut self, gateway: &dyn Gateway) -> DeskResult<Mission> {
        let payload = self.draft.payload()?;

        let saved = match self.editing {
            Some(id) => {
                tracing::info!(mission_id = id, "updating mission");
                gateway.update_mission(id, &payload).await?
            }
            None => {
                tracing::info!(assignees = payload.due_to.len(), "creating mission");
                gateway.create_mission(&payload).await?
            }
        };

        self.draft.clear();
        Ok(saved)
    }
}
