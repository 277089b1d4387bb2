/// Task model and database operations
///
/// A task is owned by the user who created it (`author`) and remembers the
/// last user who updated it (`editor`). Completion is encoded by the presence
/// of the `completed` timestamp.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BLOB PRIMARY KEY NOT NULL,
///     title TEXT NOT NULL,
///     description TEXT,
///     author BLOB NOT NULL REFERENCES users(id),
///     editor BLOB REFERENCES users(id),
///     attachments TEXT,          -- JSON array of filenames, or NULL
///     completed TEXT,            -- completion timestamp, NULL while open
///     created_at TEXT NOT NULL,
///     updated_at TEXT NOT NULL
/// );
/// ```
///
/// The `attachments` column is decoded into `Option<Vec<String>>` when a row
/// is read and encoded back to JSON text when a task is written. `NULL` and
/// `[]` are distinct: a task created without files has no list at all.
///
/// # Example
///
/// ```no_run
/// use tasklist_shared::models::task::{Task, CreateTask, ListQuery};
/// use sqlx::SqlitePool;
/// use uuid::Uuid;
///
/// # async fn example(pool: SqlitePool, author: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     title: "Write report".to_string(),
///     description: Some("Quarterly numbers".to_string()),
///     author,
///     attachments: None,
/// }).await?;
///
/// let page = Task::list(&pool, ListQuery::default()).await?;
/// assert!(page.iter().any(|t| t.id == task.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::user::{User, UserSummary};

const TASK_COLUMNS: &str =
    "id, title, description, author, editor, attachments, completed, created_at, updated_at";

/// Error decoding or encoding the attachments column
#[derive(Debug, thiserror::Error)]
#[error("Invalid attachments column: {0}")]
pub struct AttachmentCodecError(#[from] serde_json::Error);

/// Wraps a codec failure on the write path
fn encode_error(err: AttachmentCodecError) -> sqlx::Error {
    sqlx::Error::Protocol(format!("Failed to encode attachments: {}", err))
}

/// Decodes the stored attachments column
pub fn decode_attachments(raw: Option<&str>) -> Result<Option<Vec<String>>, AttachmentCodecError> {
    match raw {
        None => Ok(None),
        Some(text) => Ok(serde_json::from_str::<Option<Vec<String>>>(text)?),
    }
}

/// Encodes attachments for storage
pub fn encode_attachments(list: Option<&[String]>) -> Result<Option<String>, AttachmentCodecError> {
    match list {
        None => Ok(None),
        Some(names) => Ok(Some(serde_json::to_string(names)?)),
    }
}

/// Raw `tasks` row as stored
#[derive(Debug, Clone, sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    author: Uuid,
    editor: Option<Uuid>,
    attachments: Option<String>,
    completed: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = sqlx::Error;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let attachments = decode_attachments(row.attachments.as_deref())
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description,
            author: row.author,
            attachments,
            completed: row.completed,
            editor: row.editor,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Task record
///
/// Field order is the JSON field order of API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID (UUID v4)
    pub id: Uuid,

    /// Title, at most 255 characters
    pub title: String,

    pub description: Option<String>,

    /// User who created the task
    pub author: Uuid,

    /// Stored attachment filenames in upload order
    pub attachments: Option<Vec<String>>,

    /// When the task was completed, `None` while open
    pub completed: Option<DateTime<Utc>>,

    /// User who last updated the task
    pub editor: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,

    /// Authenticated caller
    pub author: Uuid,

    /// Filenames of files stored with the request, `None` when none were sent
    pub attachments: Option<Vec<String>>,
}

/// Column a task listing is sorted by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSort {
    #[default]
    Completed,
    CreatedAt,
    UpdatedAt,
}

impl TaskSort {
    /// Accepted query values
    pub const VALUES: [&'static str; 3] = ["completed", "created_at", "updated_at"];

    /// Parses a query value
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "completed" => Some(TaskSort::Completed),
            "created_at" => Some(TaskSort::CreatedAt),
            "updated_at" => Some(TaskSort::UpdatedAt),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            TaskSort::Completed => "completed",
            TaskSort::CreatedAt => "created_at",
            TaskSort::UpdatedAt => "updated_at",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub const VALUES: [&'static str; 2] = ["asc", "desc"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Parameters of a task listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub sort: TaskSort,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl ListQuery {
    pub const DEFAULT_LIMIT: i64 = 10;
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            sort: TaskSort::default(),
            order: SortOrder::default(),
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Task with author and editor resolved to user summaries
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub author: UserSummary,
    pub attachments: Option<Vec<String>>,
    pub completed: Option<DateTime<Utc>>,
    pub editor: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new task
    ///
    /// `editor` and `completed` start unset.
    pub async fn create(pool: &SqlitePool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        let attachments = encode_attachments(data.attachments.as_deref())
            .map_err(encode_error)?;

        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks (id, title, description, author, attachments, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(data.title)
        .bind(data.description)
        .bind(data.author)
        .bind(attachments)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        row.try_into()
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {} FROM tasks WHERE id = ?",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        row.map(Task::try_from).transpose()
    }

    /// Finds a task by the raw key from a request path
    ///
    /// A key that is not a UUID finds nothing.
    pub async fn find_by_key(pool: &SqlitePool, key: &str) -> Result<Option<Self>, sqlx::Error> {
        match Uuid::parse_str(key) {
            Ok(id) => Self::find_by_id(pool, id).await,
            Err(_) => Ok(None),
        }
    }

    /// Lists tasks sorted and paged per `query`
    ///
    /// Ties on the sort column are broken by id in the same direction so
    /// paging is stable.
    pub async fn list(pool: &SqlitePool, query: ListQuery) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {cols} FROM tasks ORDER BY {col} {dir}, id {dir} LIMIT ? OFFSET ?",
            cols = TASK_COLUMNS,
            col = query.sort.column(),
            dir = query.order.keyword(),
        );

        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(pool)
            .await?;

        rows.into_iter().map(Task::try_from).collect()
    }

    /// Persists the mutable fields of a task
    ///
    /// Writes title, description, editor, attachments, completed and
    /// updated_at. Returns `None` if the row no longer exists.
    pub async fn save(pool: &SqlitePool, task: &Task) -> Result<Option<Self>, sqlx::Error> {
        let attachments = encode_attachments(task.attachments.as_deref())
            .map_err(encode_error)?;

        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks
            SET title = ?,
                description = ?,
                editor = ?,
                attachments = ?,
                completed = ?,
                updated_at = ?
            WHERE id = ?
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.editor)
        .bind(attachments)
        .bind(task.completed)
        .bind(task.updated_at)
        .bind(task.id)
        .fetch_optional(pool)
        .await?;

        row.map(Task::try_from).transpose()
    }

    /// Deletes a task row
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Resolves author and editor into user summaries
    pub async fn with_users(self, pool: &SqlitePool) -> Result<TaskDetail, sqlx::Error> {
        let author = User::find_by_id(pool, self.author)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let editor = match self.editor {
            Some(id) => User::find_by_id(pool, id).await?.map(UserSummary::from),
            None => None,
        };

        Ok(TaskDetail {
            id: self.id,
            title: self.title,
            description: self.description,
            author: author.into(),
            attachments: self.attachments,
            completed: self.completed,
            editor,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
