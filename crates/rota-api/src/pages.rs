use axum::extract::State;
use axum::response::Html;

use rota_db::models::{MemberRow, TaskBundle, UserRow};
use rota_db::time;

use crate::AppState;
use crate::error::{ApiError, join_error};

/// Human-facing overview: every user and every task with its references
/// populated. Rendered server-side; no assets, no scripts.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let db = state.clone();
    let (users, tasks) = tokio::task::spawn_blocking(move || {
        Ok::<_, ApiError>((db.db.list_users()?, db.db.list_tasks()?))
    })
    .await
    .map_err(join_error)??;

    Ok(Html(render_index(&users, &tasks)))
}

fn render_index(users: &[UserRow], tasks: &[TaskBundle]) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Rota</title>\n<style>\n\
         body { font-family: sans-serif; margin: 2rem; }\n\
         table { border-collapse: collapse; margin-bottom: 2rem; }\n\
         th, td { border: 1px solid #ccc; padding: 0.4rem 0.8rem; text-align: left; }\n\
         .done { color: #2a7a2a; }\n\
         .pending { color: #a05a00; }\n\
         </style>\n</head>\n<body>\n<h1>Rota</h1>\n",
    );

    page.push_str("<h2>Users</h2>\n<table>\n<tr><th>Full name</th><th>Username</th><th>Role</th></tr>\n");
    for user in users {
        page.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(&user.full_name),
            escape(&user.username),
            escape(&user.role),
        ));
    }
    page.push_str("</table>\n");

    page.push_str(
        "<h2>Tasks</h2>\n<table>\n<tr><th>Title</th><th>Creator</th><th>Assigned to</th>\
         <th>Completed by</th><th>Status</th><th>Created</th></tr>\n",
    );
    for bundle in tasks {
        let creator = bundle
            .creator
            .as_ref()
            .map(|c| escape(&c.full_name))
            .unwrap_or_else(|| "unknown".to_string());
        let (class, status) = if bundle.task.is_done {
            ("done", "done")
        } else {
            ("pending", "pending")
        };
        let created = time::parse(&bundle.task.created_at)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| bundle.task.created_at.clone());

        page.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"{}\">{}</td><td>{}</td></tr>\n",
            escape(&bundle.task.title),
            creator,
            member_list(&bundle.assigned_to),
            member_list(&bundle.completed_by),
            class,
            status,
            escape(&created),
        ));
    }
    page.push_str("</table>\n</body>\n</html>\n");

    page
}

fn member_list(members: &[MemberRow]) -> String {
    if members.is_empty() {
        return "&mdash;".to_string();
    }
    members
        .iter()
        .map(|m| format!("{} ({})", escape(&m.full_name), escape(&m.username)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
