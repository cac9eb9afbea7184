//! Seeds the database with a demo admin and two normal users, wiping whatever
//! was there first. Registration only creates normal users, so this is how an
//! admin account comes to exist.

use std::path::PathBuf;

use tracing::info;
use uuid::Uuid;

use rota_api::users::hash_password;
use rota_types::models::Role;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed=info,rota_db=info".into()),
        )
        .init();

    let db_path = std::env::var("ROTA_DB_PATH").unwrap_or_else(|_| "rota.db".into());
    let db = rota_db::Database::open(&PathBuf::from(&db_path))?;

    db.clear_all()?;
    info!("Cleared existing users and tasks");

    let password_hash = hash_password("123456")?;
    for (username, full_name, role) in [
        ("admin", "Admin User", Role::Admin),
        ("user_a", "User A", Role::Normal),
        ("user_b", "User B", Role::Normal),
    ] {
        db.create_user(
            &Uuid::new_v4().to_string(),
            username,
            &password_hash,
            full_name,
            role.as_str(),
        )?;
        info!("Created user {} ({})", username, role.as_str());
    }

    Ok(())
}
