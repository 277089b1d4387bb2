/// Task endpoints
///
/// All routes here sit behind the bearer auth layer; handlers read the caller
/// from the [`AuthContext`] extension and pass `auth.user_id` explicitly to
/// every mutating operation.
///
/// # Endpoints
///
/// - `GET    /tasks`     - List tasks (sorted, paged)
/// - `POST   /tasks`     - Create a task (JSON or multipart)
/// - `GET    /tasks/:id` - Show a task with author and editor expanded
/// - `PUT    /tasks/:id` - Update a task (JSON or multipart)
/// - `DELETE /tasks/:id` - Delete a task and its files

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::{deserialize_flag, BoundTask, TaskPayload},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use tasklist_shared::{
    auth::middleware::AuthContext,
    models::task::{CreateTask, ListQuery, SortOrder, Task, TaskDetail, TaskSort},
    reconcile::{reconcile, TaskChanges},
};
use tracing::{debug, info};
use validator::Validate;

/// Bounds shared by `limit` and `offset`
const PAGE_MIN: i64 = 1;
const PAGE_MAX: i64 = 100;

/// Raw list query string
///
/// Everything arrives as text so bad values produce field-level 422s instead
/// of a query rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub sort_by: Option<String>,
    pub order_by: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListParams {
    /// Validates the parameters and fills in defaults
    pub fn into_query(self) -> ApiResult<ListQuery> {
        let mut errors = Vec::new();
        let mut query = ListQuery::default();

        if let Some(raw) = self.sort_by.as_deref() {
            match TaskSort::parse(raw) {
                Some(sort) => query.sort = sort,
                None => errors.push(ValidationErrorDetail::new(
                    "sort_by",
                    format!("The selected sort_by is invalid. Allowed: {}.", TaskSort::VALUES.join(", ")),
                )),
            }
        }

        if let Some(raw) = self.order_by.as_deref() {
            match SortOrder::parse(raw) {
                Some(order) => query.order = order,
                None => errors.push(ValidationErrorDetail::new(
                    "order_by",
                    format!("The selected order_by is invalid. Allowed: {}.", SortOrder::VALUES.join(", ")),
                )),
            }
        }

        match parse_page_bound("limit", self.limit.as_deref()) {
            Ok(Some(limit)) => query.limit = limit,
            Ok(None) => {}
            Err(detail) => errors.push(detail),
        }

        match parse_page_bound("offset", self.offset.as_deref()) {
            Ok(Some(offset)) => query.offset = offset,
            Ok(None) => {}
            Err(detail) => errors.push(detail),
        }

        if errors.is_empty() {
            Ok(query)
        } else {
            Err(ApiError::ValidationError(errors))
        }
    }
}

/// Parses an optional integer in `[PAGE_MIN, PAGE_MAX]`
fn parse_page_bound(field: &str, raw: Option<&str>) -> Result<Option<i64>, ValidationErrorDetail> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let value: i64 = raw.trim().parse().map_err(|_| {
        ValidationErrorDetail::new(field, format!("The {} field must be an integer.", field))
    })?;

    if !(PAGE_MIN..=PAGE_MAX).contains(&value) {
        return Err(ValidationErrorDetail::new(
            field,
            format!("The {} field must be between {} and {}.", field, PAGE_MIN, PAGE_MAX),
        ));
    }

    Ok(Some(value))
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(
        required(message = "The title field is required."),
        length(min = 1, max = 255, message = "The title field must be between 1 and 255 characters.")
    )]
    pub title: Option<String>,

    pub description: Option<String>,
}

/// Update task request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "The title field must be between 1 and 255 characters."))]
    pub title: Option<String>,

    pub description: Option<String>,

    /// Absent leaves completion unchanged
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub completed: Option<bool>,

    /// Filenames to remove from the task
    pub del_attachments: Option<Vec<String>>,
}

impl UpdateTaskRequest {
    fn into_changes(self) -> TaskChanges {
        TaskChanges {
            title: self.title,
            description: self.description,
            completed: self.completed,
            del_attachments: self.del_attachments.unwrap_or_default(),
        }
    }
}

/// List tasks
///
/// # Endpoint
///
/// ```text
/// GET /tasks?sort_by=created_at&order_by=desc&limit=10&offset=1
/// Authorization: Bearer tl_...
/// ```
///
/// `sort_by` defaults to `completed`, `order_by` to `asc`, `limit` to 10 and
/// `offset` to 0. No total count is returned.
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Task>>> {
    let query = params.into_query()?;
    let tasks = Task::list(&state.db, query).await?;

    debug!(count = tasks.len(), sort = ?query.sort, order = ?query.order, "Listed tasks");

    Ok(Json(tasks))
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /tasks
/// Content-Type: application/json
///
/// { "title": "test", "description": "test" }
/// ```
///
/// or `multipart/form-data` with a `data` JSON field and `attachments[]`
/// files. Without files the task's `attachments` is `null`.
pub async fn store(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: TaskPayload<CreateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let attachments = if payload.uploads.is_empty() {
        None
    } else {
        Some(state.storage.store_all(&payload.uploads).await?)
    };

    let task = Task::create(
        &state.db,
        CreateTask {
            title: payload.input.title.unwrap_or_default(),
            description: payload.input.description,
            author: auth.user_id,
            attachments,
        },
    )
    .await?;

    info!(task_id = %task.id, author = %auth.user_id, "Created task");

    Ok(Json(task))
}

/// Show a task with author and editor expanded
pub async fn show(
    State(state): State<AppState>,
    BoundTask(task): BoundTask,
) -> ApiResult<Json<TaskDetail>> {
    Ok(Json(task.with_users(&state.db).await?))
}

/// Update a task
///
/// # Endpoint
///
/// ```text
/// PUT /tasks/:id
/// Content-Type: application/json
///
/// { "completed": true, "del_attachments": ["3f7a...e1.jpg"] }
/// ```
///
/// New files are stored before the task is reconciled; files dropped from the
/// list are deleted after the task row is saved.
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    BoundTask(task): BoundTask,
    payload: TaskPayload<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let uploaded = state.storage.store_all(&payload.uploads).await?;

    let outcome = reconcile(
        task,
        payload.input.into_changes(),
        uploaded,
        auth.user_id,
        Utc::now(),
    );

    let saved = Task::save(&state.db, &outcome.task)
        .await?
        .ok_or_else(ApiError::task_not_found)?;

    state.storage.delete_all(&outcome.removed).await?;

    info!(
        task_id = %saved.id,
        editor = %auth.user_id,
        removed = outcome.removed.len(),
        "Updated task"
    );

    Ok(Json(saved))
}

/// Delete a task and its stored files
pub async fn destroy(
    State(state): State<AppState>,
    BoundTask(task): BoundTask,
) -> ApiResult<StatusCode> {
    if let Some(attachments) = &task.attachments {
        state.storage.delete_all(attachments).await?;
    }

    Task::delete(&state.db, task.id).await?;

    info!(task_id = %task.id, "Deleted task");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(sort_by: Option<&str>, order_by: Option<&str>, limit: Option<&str>, offset: Option<&str>) -> ListParams {
        ListParams {
            sort_by: sort_by.map(str::to_string),
            order_by: order_by.map(str::to_string),
            limit: limit.map(str::to_string),
            offset: offset.map(str::to_string),
        }
    }

    #[test]
    fn test_list_params_defaults() {
        let query = ListParams::default().into_query().unwrap();
        assert_eq!(query, ListQuery::default());
    }

    #[test]
    fn test_list_params_parsed() {
        let query = params(Some("updated_at"), Some("desc"), Some("5"), Some("2"))
            .into_query()
            .unwrap();

        assert_eq!(query.sort, TaskSort::UpdatedAt);
        assert_eq!(query.order, SortOrder::Desc);
        assert_eq!(query.limit, 5);
        assert_eq!(query.offset, 2);
    }

    #[test]
    fn test_list_params_report_every_bad_field() {
        let err = params(Some("title"), Some("sideways"), Some("0"), Some("abc"))
            .into_query()
            .unwrap_err();

        let ApiError::ValidationError(details) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["sort_by", "order_by", "limit", "offset"]);
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(parse_page_bound("limit", Some("100")).unwrap(), Some(100));
        assert!(parse_page_bound("limit", Some("101")).is_err());
        assert!(parse_page_bound("offset", Some("0")).is_err());
        assert_eq!(parse_page_bound("offset", None).unwrap(), None);
    }

    #[test]
    fn test_update_request_into_changes() {
        let req: UpdateTaskRequest = serde_json::from_str(
            r#"{"completed": "0", "del_attachments": ["a.jpg"]}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());

        let changes = req.into_changes();
        assert_eq!(changes.completed, Some(false));
        assert_eq!(changes.title, None);
        assert_eq!(changes.del_attachments, vec!["a.jpg".to_string()]);
    }

    #[test]
    fn test_create_request_requires_title() {
        let req: CreateTaskRequest = serde_json::from_str(r#"{"description": "x"}"#).unwrap();
        assert!(req.validate().is_err());

        let req: CreateTaskRequest = serde_json::from_str(r#"{"title": ""}"#).unwrap();
        assert!(req.validate().is_err());

        assert!(serde_json::from_str::<CreateTaskRequest>(r#"{"title": 5}"#).is_err());
    }
}
