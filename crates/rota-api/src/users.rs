use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use rota_types::api::{RegisterRequest, UserResponse};
use rota_types::models::Role;

use crate::AppState;
use crate::error::{ApiError, join_error};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::Validation(
            "username must be 3-32 characters".into(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    let full_name = req.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(ApiError::Validation("fullName must not be blank".into()));
    }

    // Hash with Argon2id; the raw secret is never stored.
    let password_hash = hash_password(&req.password)?;

    let user_id = Uuid::new_v4();
    let username = req.username;

    let db = state.clone();
    {
        let username = username.clone();
        let full_name = full_name.clone();
        tokio::task::spawn_blocking(move || -> Result<(), ApiError> {
            if db.db.get_user_by_username(&username)?.is_some() {
                return Err(ApiError::Conflict(format!(
                    "username {} is already taken",
                    username
                )));
            }
            db.db.create_user(
                &user_id.to_string(),
                &username,
                &password_hash,
                &full_name,
                Role::Normal.as_str(),
            )?;
            Ok(())
        })
        .await
        .map_err(join_error)??;
    }

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user_id,
            username,
            full_name,
            role: Role::Normal,
        }),
    ))
}

pub fn hash_password(raw: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}
