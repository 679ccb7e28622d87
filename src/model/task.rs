use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Minimum number of characters in a task title
pub const MIN_TITLE_LEN: usize = 2;

/// A task as held by the task store and in every cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque identifier assigned by the task store
    pub id: String,
    /// Task title text
    pub title: String,
    /// Optional longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default)]
    pub is_complete: bool,
    /// Due date as an ISO 8601 string, kept verbatim from the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<String>,
}

impl Task {
    /// Create an incomplete task with no detail or due date
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            title: title.into(),
            detail: None,
            is_complete: false,
            due_at: None,
        }
    }

    /// The due date, if present and parseable
    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_at.as_deref().and_then(parse_due_at)
    }

    /// Incomplete with a valid due date strictly before `now`
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_complete && self.due_date().is_some_and(|due| due < now)
    }
}

/// Parse an ISO 8601 due date.
///
/// Accepts RFC 3339 timestamps, naive date-times (read as local time) and
/// bare dates (local midnight). Returns `None` for anything else.
pub fn parse_due_at(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return local_to_utc(naive);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(local_to_utc)
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Form input and validation
// ---------------------------------------------------------------------------

/// Client-side validation failures, raised before any request is issued
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Title must be at least 2 characters long")]
    TitleTooShort,
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.chars().count() < MIN_TITLE_LEN {
        return Err(ValidationError::TitleTooShort);
    }
    Ok(())
}

/// Fields of the create form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub detail: Option<String>,
    pub due_at: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        NewTask {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)
    }
}

/// Fields of the update form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: String,
    pub is_complete: bool,
    pub detail: Option<String>,
    pub due_at: Option<String>,
}

impl TaskUpdate {
    /// Prefill the form from an existing task
    pub fn from_task(task: &Task) -> Self {
        TaskUpdate {
            title: task.title.clone(),
            is_complete: task.is_complete,
            detail: task.detail.clone(),
            due_at: task.due_at.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)
    }
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// A request body for the task store. Absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<String>,
}

/// Drop `detail` and `due_at` when they are absent or the empty string.
pub fn strip_empty_optional_fields(mut payload: TaskPayload) -> TaskPayload {
    payload.detail = payload.detail.filter(|s| !s.is_empty());
    payload.due_at = payload.due_at.filter(|s| !s.is_empty());
    payload
}

impl TaskPayload {
    /// `{title, detail?, dueAt?}`
    pub fn for_create(task: &NewTask) -> Self {
        strip_empty_optional_fields(TaskPayload {
            title: Some(task.title.clone()),
            detail: task.detail.clone(),
            due_at: task.due_at.clone(),
            ..Default::default()
        })
    }

    /// `{title, isComplete, detail?, dueAt?}`
    pub fn for_update(update: &TaskUpdate) -> Self {
        strip_empty_optional_fields(TaskPayload {
            title: Some(update.title.clone()),
            is_complete: Some(update.is_complete),
            detail: update.detail.clone(),
            due_at: update.due_at.clone(),
            ..Default::default()
        })
    }

    /// The full task with the new completion flag when it is known locally,
    /// otherwise `{isComplete}` alone.
    pub fn for_toggle(current: Option<&Task>, is_complete: bool) -> Self {
        match current {
            Some(task) => strip_empty_optional_fields(TaskPayload {
                id: Some(task.id.clone()),
                title: Some(task.title.clone()),
                detail: task.detail.clone(),
                is_complete: Some(is_complete),
                due_at: task.due_at.clone(),
            }),
            None => TaskPayload {
                is_complete: Some(is_complete),
                ..Default::default()
            },
        }
    }

    /// Overlay the present fields onto `task`. The id is never changed.
    pub fn merge_into(&self, task: &Task) -> Task {
        let mut merged = task.clone();
        if let Some(title) = &self.title {
            merged.title = title.clone();
        }
        if let Some(detail) = &self.detail {
            merged.detail = Some(detail.clone());
        }
        if let Some(is_complete) = self.is_complete {
            merged.is_complete = is_complete;
        }
        if let Some(due_at) = &self.due_at {
            merged.due_at = Some(due_at.clone());
        }
        merged
    }
}
