//! End-to-end test: boots the real router on a loopback port and drives the
//! HTTP surface the way a client would.

use std::sync::Arc;

use serde_json::{Value, json};
use uuid::Uuid;

use rota_api::users::hash_password;
use rota_api::{AppState, AppStateInner};

async fn spawn_server() -> (String, AppState) {
    let db = rota_db::Database::open_in_memory().unwrap();
    let state: AppState = Arc::new(AppStateInner { db });
    let app = rota_api::router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

/// Registration only creates normal users; admins are inserted directly, the
/// same way the seed tool does it.
fn seed_admin(state: &AppState, username: &str, full_name: &str) {
    let hash = hash_password("123456").unwrap();
    state
        .db
        .create_user(
            &Uuid::new_v4().to_string(),
            username,
            &hash,
            full_name,
            "admin",
        )
        .unwrap();
}

async fn register(client: &reqwest::Client, base: &str, username: &str, full_name: &str) {
    let res = client
        .post(format!("{base}/register"))
        .json(&json!({
            "username": username,
            "password": "correct-horse",
            "fullName": full_name,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
}

#[tokio::test]
async fn register_create_toggle_and_query_flow() {
    let (base, state) = spawn_server().await;
    let client = reqwest::Client::new();

    register(&client, &base, "alice", "Alice Nguyen").await;
    seed_admin(&state, "boss", "The Boss");

    // boss assigns T1 to alice and boss
    let res = client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "T1", "username": "boss", "assignees": "alice,boss"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    let task: Value = res.json().await.unwrap();
    let task_id = task["id"].as_str().unwrap().to_string();
    assert_eq!(task["isDone"], Value::Bool(false));
    assert_eq!(task["creator"]["username"], "boss");
    assert_eq!(task["assignedTo"].as_array().unwrap().len(), 2);
    assert!(task["completedBy"].as_array().unwrap().is_empty());

    // alice checks in; boss has not yet, so the task stays pending
    let res = client
        .put(format!("{base}/tasks/{task_id}"))
        .json(&json!({"activeUser": "alice"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["isDone"], Value::Bool(false));
    assert!(body["completedAt"].is_null());

    // boss checks in; every assignee has now completed
    let res = client
        .put(format!("{base}/tasks/{task_id}"))
        .json(&json!({"activeUser": "boss"}))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["isDone"], Value::Bool(true));
    assert!(body["completedAt"].is_string());

    // the done task leaves the incomplete listing
    let pending: Value = client
        .get(format!("{base}/tasks/incomplete"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(
        pending
            .as_array()
            .unwrap()
            .iter()
            .all(|t| t["id"] != task["id"])
    );

    // it was created just now, so the today listing sees it
    let today: Value = client
        .get(format!("{base}/tasks/today"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(
        today
            .as_array()
            .unwrap()
            .iter()
            .any(|t| t["id"] == task["id"])
    );
}

#[tokio::test]
async fn registration_rejects_duplicates_and_bad_input() {
    let (base, _state) = spawn_server().await;
    let client = reqwest::Client::new();

    register(&client, &base, "alice", "Alice Nguyen").await;

    let res = client
        .post(format!("{base}/register"))
        .json(&json!({"username": "alice", "password": "correct-horse", "fullName": "Other Alice"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 409);

    let res = client
        .post(format!("{base}/register"))
        .json(&json!({"username": "bob", "password": "short", "fullName": "Bob"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn task_creation_enforces_roles_and_known_creators() {
    let (base, state) = spawn_server().await;
    let client = reqwest::Client::new();

    register(&client, &base, "alice", "Alice Nguyen").await;
    seed_admin(&state, "boss", "The Boss");

    // unknown creator
    let res = client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "T", "username": "ghost"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    // a normal user may not assign to someone else, and no task is created
    let res = client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "T", "username": "alice", "assignees": "boss"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let all: Value = client
        .get(format!("{base}/tasks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(all.as_array().unwrap().is_empty());

    // without an assignee list the task goes to the creator alone
    let res = client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "Mine", "username": "alice"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    let task: Value = res.json().await.unwrap();
    assert_eq!(task["assignedTo"][0]["username"], "alice");
}

#[tokio::test]
async fn toggle_rejects_outsiders_and_unknown_ids() {
    let (base, state) = spawn_server().await;
    let client = reqwest::Client::new();

    register(&client, &base, "alice", "Alice Nguyen").await;
    register(&client, &base, "carol", "Carol Tran").await;
    seed_admin(&state, "boss", "The Boss");

    let res = client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "T1", "username": "boss", "assignees": "alice"}))
        .send()
        .await
        .unwrap();
    let task: Value = res.json().await.unwrap();
    let task_id = task["id"].as_str().unwrap();

    // carol is not assigned
    let res = client
        .put(format!("{base}/tasks/{task_id}"))
        .json(&json!({"activeUser": "carol"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    // unknown acting user
    let res = client
        .put(format!("{base}/tasks/{task_id}"))
        .json(&json!({"activeUser": "ghost"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    // unknown task id
    let res = client
        .put(format!("{base}/tasks/{}", Uuid::new_v4()))
        .json(&json!({"activeUser": "alice"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn name_search_and_reserved_segments() {
    let (base, state) = spawn_server().await;
    let client = reqwest::Client::new();

    register(&client, &base, "alice", "Alice Nguyen").await;
    seed_admin(&state, "boss", "The Boss");

    client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "His", "username": "boss"}))
        .send()
        .await
        .unwrap();

    // creator-name prefix search, case-insensitive
    let found: Value = client
        .get(format!("{base}/tasks/the"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["title"], "His");

    // the dedicated routes win for the reserved literals...
    let res = client.get(format!("{base}/tasks/today")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    // ...and a cased variant cannot sneak through the search route
    let res = client.get(format!("{base}/tasks/Today")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    let res = client
        .get(format!("{base}/tasks/Incomplete"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn legacy_user_listing_is_empty_for_new_tasks() {
    let (base, state) = spawn_server().await;
    let client = reqwest::Client::new();

    register(&client, &base, "alice", "Alice Nguyen").await;
    seed_admin(&state, "boss", "The Boss");

    client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "T1", "username": "boss", "assignees": "alice,boss"}))
        .send()
        .await
        .unwrap();

    // the legacy column is never written by the create path
    let tasks: Value = client
        .get(format!("{base}/tasks/user/alice"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(tasks.as_array().unwrap().is_empty());

    let res = client
        .get(format!("{base}/tasks/user/ghost"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn delete_removes_the_task_unconditionally() {
    let (base, _state) = spawn_server().await;
    let client = reqwest::Client::new();

    register(&client, &base, "alice", "Alice Nguyen").await;

    let res = client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "Short lived", "username": "alice"}))
        .send()
        .await
        .unwrap();
    let task: Value = res.json().await.unwrap();
    let task_id = task["id"].as_str().unwrap();

    let res = client
        .delete(format!("{base}/tasks/{task_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Deleted");

    let all: Value = client
        .get(format!("{base}/tasks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(all.as_array().unwrap().is_empty());

    // deleting an id that no longer exists still reports success
    let res = client
        .delete(format!("{base}/tasks/{task_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn index_page_renders_users_and_tasks() {
    let (base, state) = spawn_server().await;
    let client = reqwest::Client::new();

    register(&client, &base, "alice", "Alice Nguyen").await;
    seed_admin(&state, "boss", "The Boss");

    client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "Write minutes", "username": "boss", "assignees": "alice"}))
        .send()
        .await
        .unwrap();

    let res = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let content_type = res
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/html"));

    let html = res.text().await.unwrap();
    assert!(html.contains("Alice Nguyen"));
    assert!(html.contains("The Boss"));
    assert!(html.contains("Write minutes"));
}
