use chrono::{DateTime, Utc};

/// Derives a task's done state from its assigned and completed sets.
///
/// A task is done once every assignee has checked in, i.e. the assigned-set
/// is a subset of the completed-set. Returns the completion timestamp to
/// store: `now` on done, `None` otherwise (a toggle that un-does a task also
/// clears the timestamp).
///
/// An empty assigned-set is vacuously done. In practice every task carries at
/// least its creator as an assignee, so this only shows up for tasks created
/// with an assignee list that resolved to nobody.
pub fn completion_status(
    assigned: &[String],
    completed: &[String],
    now: DateTime<Utc>,
) -> (bool, Option<DateTime<Utc>>) {
    let done = assigned.iter().all(|id| completed.contains(id));
    if done { (true, Some(now)) } else { (false, None) }
}
