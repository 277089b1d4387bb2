/// Task update reconciliation
///
/// Applies a partial update to a loaded task without touching the database
/// or the file area. The caller stores uploaded files first, passes their
/// filenames in, persists the returned task, and only then deletes the files
/// listed in [`Reconciled::removed`].
///
/// # Rules
///
/// 1. `title` / `description` overwrite when given, otherwise keep.
/// 2. `completed`: `Some(true)` stamps `now`, `Some(false)` clears, `None` keeps.
/// 3. Uploaded filenames are appended after the existing list in order.
/// 4. Each `del_attachments` entry removes one matching occurrence; unknown
///    names are ignored. A name is reported in [`Reconciled::removed`] only
///    once no occurrence of it is left in the list.
/// 5. `editor` becomes the caller and `updated_at` becomes `now`.
///
/// A task without an attachment list (`None`) takes the uploaded filenames as
/// its list and skips step 4.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use tasklist_shared::models::task::Task;
/// use tasklist_shared::reconcile::{reconcile, TaskChanges};
/// use uuid::Uuid;
///
/// let author = Uuid::new_v4();
/// let now = Utc::now();
/// let task = Task {
///     id: Uuid::new_v4(),
///     title: "test".to_string(),
///     description: None,
///     author,
///     attachments: Some(vec!["a.jpg".to_string()]),
///     completed: None,
///     editor: None,
///     created_at: now,
///     updated_at: now,
/// };
///
/// let changes = TaskChanges {
///     completed: Some(true),
///     del_attachments: vec!["a.jpg".to_string()],
///     ..TaskChanges::default()
/// };
/// let out = reconcile(task, changes, vec!["b.jpg".to_string()], author, now);
///
/// assert_eq!(out.task.attachments, Some(vec!["b.jpg".to_string()]));
/// assert_eq!(out.removed, vec!["a.jpg".to_string()]);
/// assert_eq!(out.task.completed, Some(now));
/// ```

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::task::Task;

/// Requested changes to a task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,

    /// `None` leaves completion unchanged
    pub completed: Option<bool>,

    /// Filenames to drop from the attachment list
    pub del_attachments: Vec<String>,
}

/// Outcome of a reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// Task state to persist
    pub task: Task,

    /// Filenames the task no longer lists, whose stored files must be deleted
    /// once the task is saved
    pub removed: Vec<String>,
}

/// Applies `changes` and freshly stored `uploaded` filenames to `task`
pub fn reconcile(
    mut task: Task,
    changes: TaskChanges,
    uploaded: Vec<String>,
    editor: Uuid,
    now: DateTime<Utc>,
) -> Reconciled {
    if let Some(title) = changes.title {
        task.title = title;
    }
    if let Some(description) = changes.description {
        task.description = Some(description);
    }

    match changes.completed {
        Some(true) => task.completed = Some(now),
        Some(false) => task.completed = None,
        None => {}
    }

    let mut removed = Vec::new();
    task.attachments = match task.attachments.take() {
        Some(mut list) => {
            list.extend(uploaded);
            for name in changes.del_attachments {
                if let Some(pos) = list.iter().position(|existing| *existing == name) {
                    list.remove(pos);
                    if !list.contains(&name) && !removed.contains(&name) {
                        removed.push(name);
                    }
                }
            }
            Some(list)
        }
        None if uploaded.is_empty() => None,
        None => Some(uploaded),
    };

    task.editor = Some(editor);
    task.updated_at = now;

    Reconciled { task, removed }
}
