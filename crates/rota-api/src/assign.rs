use rota_db::Database;
use rota_db::models::UserRow;
use rota_types::models::Role;

use crate::error::ApiError;

/// Resolves the assigned-set for a new task.
///
/// An absent or blank list assigns the task to its creator alone. Otherwise
/// the list is split on commas, each name trimmed, and a non-admin creator may
/// only name themselves — anything else fails before any task is created.
/// Names are matched case-sensitively against username or full name; names
/// that match nobody are dropped, so a list of unknown names produces a task
/// assigned to nobody.
pub fn resolve_assignees(
    db: &Database,
    creator: &UserRow,
    assignees: Option<&str>,
) -> Result<Vec<String>, ApiError> {
    let list = assignees.map(str::trim).filter(|s| !s.is_empty());
    let Some(list) = list else {
        return Ok(vec![creator.id.clone()]);
    };

    let names: Vec<String> = list.split(',').map(|name| name.trim().to_string()).collect();

    if !Role::parse(&creator.role).is_admin()
        && names.iter().any(|name| name != &creator.username)
    {
        return Err(ApiError::Forbidden(
            "only an admin may assign tasks to other users".into(),
        ));
    }

    let users = db.find_users_by_names(&names)?;
    Ok(users.into_iter().map(|u| u.id).collect())
}
