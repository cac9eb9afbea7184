use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Role;

// -- Registration --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role: Role,
}

// -- Tasks --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateTaskRequest {
    pub title: String,
    /// Username of the creator. There is no session model; callers identify
    /// themselves per request.
    pub username: String,
    /// Optional comma-separated usernames or full names to assign to.
    /// Absent or blank means the task is assigned to the creator alone.
    pub assignees: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ToggleTaskRequest {
    /// Username of the assignee checking in (or un-checking).
    pub active_user: String,
}

/// A user reference embedded in task responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: Uuid,
    pub title: String,
    pub is_done: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// None if the creator row is gone; users are never deleted through the
    /// API, so this only happens with a hand-edited database.
    pub creator: Option<UserRef>,
    pub assigned_to: Vec<UserRef>,
    pub completed_by: Vec<UserRef>,
}
