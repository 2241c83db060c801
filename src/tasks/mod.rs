//! Task record model and request validation.
//!
//! The wire payloads (`CreateTaskRequest`, `UpdateTaskRequest`) are plain
//! serde structs validated into storage-ready shapes (`NewTask`, `TaskPatch`)
//! before any database interaction. Update payloads distinguish "field
//! absent" from "field explicitly null" so partial updates only touch the
//! fields a client actually sent.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum title length in characters, counted after trimming.
pub const TITLE_MAX_CHARS: usize = 255;

// ─── Status enumeration ──────────────────────────────────────────────────────

/// Closed set of task states. Serializes as the lowercase snake_case token
/// both in JSON and in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(format!(
                "unknown status '{other}' — expected one of: todo, in_progress, completed"
            )),
        }
    }
}

// ─── Record shape ────────────────────────────────────────────────────────────

/// The persisted task record, as stored and as serialized in responses.
/// Timestamps are RFC 3339 UTC strings; `updated_at` equals `created_at`
/// until the first update.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub created_at: String,
    pub updated_at: String,
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// A rejected request field and the reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct InvalidField {
    pub field: &'static str,
    pub message: String,
}

fn validate_title(title: String) -> Result<String, InvalidField> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(InvalidField {
            field: "title",
            message: "title must not be empty or whitespace".to_string(),
        });
    }
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        return Err(InvalidField {
            field: "title",
            message: format!("title must be at most {TITLE_MAX_CHARS} characters"),
        });
    }
    Ok(title)
}

/// Parse a status token from a payload or query string.
pub fn parse_status(token: &str) -> Result<TaskStatus, InvalidField> {
    token.parse().map_err(|message| InvalidField {
        field: "status",
        message,
    })
}

// ─── Create payload ──────────────────────────────────────────────────────────

/// POST /tasks/ body.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A validated create payload, ready to persist. Also the output of
/// `TaskPatch::apply`, since a merged update has the same shape.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
}

impl CreateTaskRequest {
    pub fn validate(self) -> Result<NewTask, InvalidField> {
        let title = validate_title(self.title)?;
        let status = match self.status.as_deref() {
            Some(token) => parse_status(token)?,
            None => TaskStatus::Todo,
        };
        Ok(NewTask {
            title,
            description: self.description,
            status,
        })
    }
}

// ─── Update payload ──────────────────────────────────────────────────────────

/// PUT /tasks/{id} body. Double-`Option` fields distinguish "absent" from
/// "explicitly null": an omitted field leaves the stored value untouched,
/// `"description": null` clears the column, and null for a non-nullable
/// field is rejected.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default, deserialize_with = "explicit_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_option")]
    pub status: Option<Option<String>>,
}

/// Deserialize any present value (including null) as `Some(...)`, so the
/// outer `Option` tracks field presence via `#[serde(default)]`.
fn explicit_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Fields to change on an existing task. `None` = leave untouched;
/// `description: Some(None)` clears the column.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
}

impl UpdateTaskRequest {
    pub fn validate(self) -> Result<TaskPatch, InvalidField> {
        let title = match self.title {
            None => None,
            Some(None) => {
                return Err(InvalidField {
                    field: "title",
                    message: "title must not be null".to_string(),
                })
            }
            Some(Some(title)) => Some(validate_title(title)?),
        };
        let status = match self.status {
            None => None,
            Some(None) => {
                return Err(InvalidField {
                    field: "status",
                    message: "status must not be null".to_string(),
                })
            }
            Some(Some(token)) => Some(parse_status(&token)?),
        };
        Ok(TaskPatch {
            title,
            description: self.description,
            status,
        })
    }
}

impl TaskPatch {
    /// Field-by-field merge onto the current row. Fields absent from the
    /// patch keep their stored value.
    pub fn apply(&self, current: &TaskRow) -> NewTask {
        NewTask {
            title: self
                .title
                .clone()
                .unwrap_or_else(|| current.title.clone()),
            description: match &self.description {
                Some(explicit) => explicit.clone(),
                None => current.description.clone(),
            },
            status: self.status.unwrap_or(current.status),
        }
    }
}
