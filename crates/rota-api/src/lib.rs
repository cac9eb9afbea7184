pub mod assign;
pub mod error;
pub mod pages;
pub mod tasks;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use rota_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}

/// Builds the full route table. The fixed segments (`today`, `incomplete`)
/// are separate routes and win over `/tasks/{name}`; the name-search handler
/// additionally rejects those literals itself, so the rule does not depend on
/// router precedence.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/register", post(users::register))
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/tasks/user/{username}", get(tasks::tasks_for_user))
        .route("/tasks/today", get(tasks::tasks_today))
        .route("/tasks/incomplete", get(tasks::tasks_incomplete))
        // One registration for the shared `/tasks/{..}` shape: GET searches by
        // creator name, PUT/DELETE address a task id.
        .route(
            "/tasks/{name}",
            get(tasks::tasks_by_creator_name)
                .put(tasks::toggle_task)
                .delete(tasks::delete_task),
        )
        .with_state(state)
}
