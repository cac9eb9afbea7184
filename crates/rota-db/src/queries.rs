use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use rota_types::status::completion_status;

use crate::Database;
use crate::models::{MemberRow, TaskBundle, TaskRow, ToggleOutcome, UserRow};
use crate::time;

const TASK_SELECT: &str = "SELECT t.id, t.title, t.is_done, t.completed_at, t.creator_id,
        t.user_id, t.created_at, c.id, c.username, c.full_name
     FROM tasks t
     LEFT JOIN users c ON t.creator_id = c.id";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        full_name: &str,
        role: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, full_name, role)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, username, password_hash, full_name, role),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, password, full_name, role, created_at
                 FROM users ORDER BY username",
            )?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Resolves a set of names against username OR full name, case-sensitive.
    /// Names that match nothing are simply absent from the result.
    pub fn find_users_by_names(&self, names: &[String]) -> Result<Vec<UserRow>> {
        if names.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=names.len()).map(|i| format!("?{}", i)).collect();
            let list = placeholders.join(", ");
            let sql = format!(
                "SELECT id, username, password, full_name, role, created_at
                 FROM users WHERE username IN ({list}) OR full_name IN ({list})"
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = names
                .iter()
                .map(|n| n as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Tasks --

    /// Inserts a task and its assigned-set in one transaction. The task always
    /// starts pending with an empty completed-set, even when the assigned-set
    /// is empty.
    pub fn create_task(
        &self,
        id: &str,
        title: &str,
        creator_id: &str,
        assignee_ids: &[String],
        created_at: DateTime<Utc>,
    ) -> Result<TaskBundle> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO tasks (id, title, creator_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, title, creator_id, time::fmt(created_at)],
            )?;
            for user_id in assignee_ids {
                tx.execute(
                    "INSERT INTO task_assignees (task_id, user_id) VALUES (?1, ?2)",
                    (id, user_id.as_str()),
                )?;
            }
            tx.commit()?;

            query_task_bundle(conn, id)?
                .ok_or_else(|| anyhow!("task {} missing after insert", id))
        })
    }

    pub fn get_task(&self, id: &str) -> Result<Option<TaskBundle>> {
        self.with_conn(|conn| query_task_bundle(conn, id))
    }

    pub fn list_tasks(&self) -> Result<Vec<TaskBundle>> {
        self.with_conn(|conn| {
            let rows = query_task_rows(conn, "", &[])?;
            attach_members(conn, rows)
        })
    }

    pub fn list_incomplete_tasks(&self) -> Result<Vec<TaskBundle>> {
        self.with_conn(|conn| {
            let rows = query_task_rows(conn, "WHERE t.is_done = 0", &[])?;
            attach_members(conn, rows)
        })
    }

    pub fn list_tasks_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TaskBundle>> {
        self.with_conn(|conn| {
            let start = time::fmt(start);
            let end = time::fmt(end);
            let rows = query_task_rows(
                conn,
                "WHERE t.created_at >= ?1 AND t.created_at <= ?2",
                &[&start, &end],
            )?;
            attach_members(conn, rows)
        })
    }

    /// Filters on the legacy single-assignee column, which the create path
    /// never populates — in practice this returns an empty set.
    pub fn list_tasks_for_legacy_user(&self, user_id: &str) -> Result<Vec<TaskBundle>> {
        self.with_conn(|conn| {
            let rows = query_task_rows(conn, "WHERE t.user_id = ?1", &[&user_id])?;
            attach_members(conn, rows)
        })
    }

    /// Tasks whose creator's full name starts with `prefix`, ASCII
    /// case-insensitive via LIKE.
    pub fn list_tasks_by_creator_prefix(&self, prefix: &str) -> Result<Vec<TaskBundle>> {
        self.with_conn(|conn| {
            let pattern = like_prefix_pattern(prefix);
            let rows = query_task_rows(
                conn,
                "WHERE c.full_name LIKE ?1 ESCAPE '\\'",
                &[&pattern],
            )?;
            attach_members(conn, rows)
        })
    }

    /// Flips the actor's membership in the completed-set and recomputes the
    /// derived done state, all inside one transaction on the single writer
    /// connection — two concurrent toggles serialize instead of overwriting
    /// each other.
    pub fn toggle_completion(
        &self,
        task_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ToggleOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            let exists: Option<String> = tx
                .query_row("SELECT id FROM tasks WHERE id = ?1", [task_id], |row| {
                    row.get(0)
                })
                .optional()?;
            if exists.is_none() {
                return Ok(ToggleOutcome::TaskMissing);
            }

            let assigned = member_ids(&tx, "task_assignees", task_id)?;
            if !assigned.iter().any(|id| id == user_id) {
                return Ok(ToggleOutcome::NotAssigned);
            }

            let removed = tx.execute(
                "DELETE FROM task_completions WHERE task_id = ?1 AND user_id = ?2",
                (task_id, user_id),
            )?;
            if removed == 0 {
                tx.execute(
                    "INSERT INTO task_completions (task_id, user_id) VALUES (?1, ?2)",
                    (task_id, user_id),
                )?;
            }

            let completed = member_ids(&tx, "task_completions", task_id)?;
            let (done, completed_at) = completion_status(&assigned, &completed, now);
            tx.execute(
                "UPDATE tasks SET is_done = ?1, completed_at = ?2 WHERE id = ?3",
                rusqlite::params![done, completed_at.map(time::fmt), task_id],
            )?;

            tx.commit()?;

            let bundle = query_task_bundle(conn, task_id)?
                .ok_or_else(|| anyhow!("task {} vanished mid-toggle", task_id))?;
            Ok(ToggleOutcome::Toggled(bundle))
        })
    }

    /// Unconditional delete; deleting an unknown id is not an error.
    pub fn delete_task(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Wipes every table. Used by the seed tool.
    pub fn clear_all(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute_batch(
                "DELETE FROM task_completions;
                 DELETE FROM task_assignees;
                 DELETE FROM tasks;
                 DELETE FROM users;",
            )?;
            Ok(())
        })
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        full_name: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, password, full_name, role, created_at
         FROM users WHERE username = ?1",
    )?;

    let row = stmt.query_row([username], user_from_row).optional()?;
    Ok(row)
}

fn query_task_rows(
    conn: &Connection,
    where_clause: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<(TaskRow, Option<MemberRow>)>> {
    let sql = format!("{TASK_SELECT} {where_clause} ORDER BY t.created_at DESC");
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map(params, |row| {
            let creator_id: Option<String> = row.get(7)?;
            let creator = match creator_id {
                Some(id) => Some(MemberRow {
                    id,
                    username: row.get(8)?,
                    full_name: row.get(9)?,
                }),
                None => None,
            };
            Ok((
                TaskRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    is_done: row.get(2)?,
                    completed_at: row.get(3)?,
                    creator_id: row.get(4)?,
                    legacy_user_id: row.get(5)?,
                    created_at: row.get(6)?,
                },
                creator,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Batch-fetch the assigned and completed sets for the listed tasks and zip
/// them onto the rows.
fn attach_members(
    conn: &Connection,
    rows: Vec<(TaskRow, Option<MemberRow>)>,
) -> Result<Vec<TaskBundle>> {
    let task_ids: Vec<String> = rows.iter().map(|(t, _)| t.id.clone()).collect();
    let mut assigned = query_members(conn, "task_assignees", &task_ids)?;
    let mut completed = query_members(conn, "task_completions", &task_ids)?;

    Ok(rows
        .into_iter()
        .map(|(task, creator)| {
            let assigned_to = assigned.remove(&task.id).unwrap_or_default();
            let completed_by = completed.remove(&task.id).unwrap_or_default();
            TaskBundle {
                task,
                creator,
                assigned_to,
                completed_by,
            }
        })
        .collect())
}

fn query_members(
    conn: &Connection,
    table: &str,
    task_ids: &[String],
) -> Result<HashMap<String, Vec<MemberRow>>> {
    if task_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=task_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT m.task_id, u.id, u.username, u.full_name
         FROM {table} m
         JOIN users u ON m.user_id = u.id
         WHERE m.task_id IN ({})
         ORDER BY u.username",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> = task_ids
        .iter()
        .map(|id| id as &dyn rusqlite::types::ToSql)
        .collect();

    let mut grouped: HashMap<String, Vec<MemberRow>> = HashMap::new();
    let rows = stmt.query_map(params.as_slice(), |row| {
        Ok((
            row.get::<_, String>(0)?,
            MemberRow {
                id: row.get(1)?,
                username: row.get(2)?,
                full_name: row.get(3)?,
            },
        ))
    })?;
    for row in rows {
        let (task_id, member) = row?;
        grouped.entry(task_id).or_default().push(member);
    }

    Ok(grouped)
}

fn member_ids(conn: &Connection, table: &str, task_id: &str) -> Result<Vec<String>> {
    let sql = format!("SELECT user_id FROM {table} WHERE task_id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map([task_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(ids)
}

fn query_task_bundle(conn: &Connection, id: &str) -> Result<Option<TaskBundle>> {
    let rows = query_task_rows(conn, "WHERE t.id = ?1", &[&id])?;
    Ok(attach_members(conn, rows)?.into_iter().next())
}

/// Escapes LIKE metacharacters and appends the trailing wildcard.
fn like_prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
