use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            full_name   TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'normal'
                        CHECK (role IN ('admin', 'normal')),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id              TEXT PRIMARY KEY,
            title           TEXT NOT NULL,
            is_done         INTEGER NOT NULL DEFAULT 0,
            completed_at    TEXT,
            creator_id      TEXT NOT NULL REFERENCES users(id),
            -- Legacy single-assignee column. The create path never writes it;
            -- the by-username listing still filters on it.
            user_id         TEXT REFERENCES users(id),
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_created
            ON tasks(created_at);

        CREATE INDEX IF NOT EXISTS idx_tasks_done
            ON tasks(is_done);

        CREATE TABLE IF NOT EXISTS task_assignees (
            task_id     TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            PRIMARY KEY (task_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS task_completions (
            task_id     TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            PRIMARY KEY (task_id, user_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
