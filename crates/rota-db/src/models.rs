/// Database row types — these map directly to SQLite rows.
/// Distinct from the rota-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub role: String,
    pub created_at: String,
}

pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub is_done: bool,
    pub completed_at: Option<String>,
    pub creator_id: String,
    /// Legacy single-assignee reference; see migrations.rs.
    pub legacy_user_id: Option<String>,
    pub created_at: String,
}

/// A user joined into a task's assigned or completed set.
pub struct MemberRow {
    pub id: String,
    pub username: String,
    pub full_name: String,
}

/// A task row with its references resolved: creator plus the assigned and
/// completed sets, each joined against users.
pub struct TaskBundle {
    pub task: TaskRow,
    pub creator: Option<MemberRow>,
    pub assigned_to: Vec<MemberRow>,
    pub completed_by: Vec<MemberRow>,
}

/// Result of a completion toggle.
pub enum ToggleOutcome {
    TaskMissing,
    NotAssigned,
    Toggled(TaskBundle),
}
