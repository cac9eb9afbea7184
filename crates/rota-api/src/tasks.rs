use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Local, Utc};
use tracing::warn;
use uuid::Uuid;

use rota_db::models::{MemberRow, TaskBundle, ToggleOutcome};
use rota_db::time;
use rota_types::api::{CreateTaskRequest, TaskResponse, ToggleTaskRequest, UserRef};

use crate::AppState;
use crate::assign;
use crate::error::{ApiError, join_error};

/// Route segments that collide with the fixed listing routes and therefore
/// can never be treated as a creator-name prefix.
const RESERVED_SEGMENTS: [&str; 2] = ["today", "incomplete"];

fn is_reserved(name: &str) -> bool {
    RESERVED_SEGMENTS.contains(&name.to_ascii_lowercase().as_str())
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::Validation("title must not be blank".into()));
    }

    let task_id = Uuid::new_v4();
    let now = Utc::now();

    let db = state.clone();
    let bundle = tokio::task::spawn_blocking(move || -> Result<TaskBundle, ApiError> {
        let creator = db
            .db
            .get_user_by_username(&req.username)?
            .ok_or_else(|| ApiError::NotFound(format!("unknown user {}", req.username)))?;

        let assignee_ids = assign::resolve_assignees(&db.db, &creator, req.assignees.as_deref())?;

        Ok(db
            .db
            .create_task(&task_id.to_string(), &title, &creator.id, &assignee_ids, now)?)
    })
    .await
    .map_err(join_error)??;

    Ok((StatusCode::CREATED, Json(task_response(bundle))))
}

pub async fn list_tasks(
    State(state): State<AppState>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let db = state.clone();
    let bundles = tokio::task::spawn_blocking(move || Ok::<_, ApiError>(db.db.list_tasks()?))
        .await
        .map_err(join_error)??;

    Ok(Json(bundles.into_iter().map(task_response).collect()))
}

/// Legacy listing: filters on the single-assignee column the create path
/// never writes, so this is empty for tasks created by this service.
pub async fn tasks_for_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let db = state.clone();
    let bundles = tokio::task::spawn_blocking(move || -> Result<Vec<TaskBundle>, ApiError> {
        let user = db
            .db
            .get_user_by_username(&username)?
            .ok_or_else(|| ApiError::NotFound(format!("unknown user {}", username)))?;
        Ok(db.db.list_tasks_for_legacy_user(&user.id)?)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(bundles.into_iter().map(task_response).collect()))
}

pub async fn tasks_today(
    State(state): State<AppState>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let (start, end) = local_day_bounds(Local::now())?;

    let db = state.clone();
    let bundles = tokio::task::spawn_blocking(move || {
        Ok::<_, ApiError>(db.db.list_tasks_created_between(start, end)?)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(bundles.into_iter().map(task_response).collect()))
}

pub async fn tasks_incomplete(
    State(state): State<AppState>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let db = state.clone();
    let bundles =
        tokio::task::spawn_blocking(move || Ok::<_, ApiError>(db.db.list_incomplete_tasks()?))
            .await
            .map_err(join_error)??;

    Ok(Json(bundles.into_iter().map(task_response).collect()))
}

/// Search by creator full-name prefix, case-insensitive. The reserved
/// segments are rejected here even though the fixed routes normally shadow
/// them, so a differently-cased "Today" cannot fall through to a search.
pub async fn tasks_by_creator_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    if is_reserved(&name) {
        return Err(ApiError::NotFound("invalid parameter".into()));
    }

    let db = state.clone();
    let bundles = tokio::task::spawn_blocking(move || {
        Ok::<_, ApiError>(db.db.list_tasks_by_creator_prefix(&name)?)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(bundles.into_iter().map(task_response).collect()))
}

pub async fn toggle_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ToggleTaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let now = Utc::now();

    let db = state.clone();
    let outcome = tokio::task::spawn_blocking(move || -> Result<ToggleOutcome, ApiError> {
        let user = db
            .db
            .get_user_by_username(&req.active_user)?
            .ok_or_else(|| ApiError::NotFound(format!("unknown user {}", req.active_user)))?;
        Ok(db.db.toggle_completion(&id.to_string(), &user.id, now)?)
    })
    .await
    .map_err(join_error)??;

    match outcome {
        ToggleOutcome::TaskMissing => Err(ApiError::NotFound(format!("unknown task {}", id))),
        ToggleOutcome::NotAssigned => Err(ApiError::Forbidden(
            "you are not assigned to this task".into(),
        )),
        ToggleOutcome::Toggled(bundle) => Ok(Json(task_response(bundle))),
    }
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    tokio::task::spawn_blocking(move || Ok::<_, ApiError>(db.db.delete_task(&id.to_string())?))
        .await
        .map_err(join_error)??;

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}

/// The day runs 00:00:00.000 through 23:59:59.999 in server-local time.
fn local_day_bounds(now: DateTime<Local>) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
    let date = now.date_naive();
    let start = date
        .and_hms_milli_opt(0, 0, 0, 0)
        .context("invalid start of day")?
        .and_local_timezone(Local)
        .earliest()
        .context("unrepresentable start of day")?;
    let end = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .context("invalid end of day")?
        .and_local_timezone(Local)
        .latest()
        .context("unrepresentable end of day")?;

    Ok((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}

pub(crate) fn task_response(bundle: TaskBundle) -> TaskResponse {
    let TaskBundle {
        task,
        creator,
        assigned_to,
        completed_by,
    } = bundle;

    TaskResponse {
        id: parse_uuid(&task.id, "task id"),
        title: task.title,
        is_done: task.is_done,
        completed_at: task.completed_at.as_deref().and_then(time::parse),
        created_at: time::parse(&task.created_at).unwrap_or_else(|| {
            warn!("Corrupt created_at '{}' on task '{}'", task.created_at, task.id);
            DateTime::default()
        }),
        creator: creator.map(user_ref),
        assigned_to: assigned_to.into_iter().map(user_ref).collect(),
        completed_by: completed_by.into_iter().map(user_ref).collect(),
    }
}

fn user_ref(member: MemberRow) -> UserRef {
    UserRef {
        id: parse_uuid(&member.id, "user id"),
        username: member.username,
        full_name: member.full_name,
    }
}

fn parse_uuid(s: &str, what: &str) -> Uuid {
    s.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, s, e);
        Uuid::default()
    })
}
