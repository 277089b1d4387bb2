/// Request extractors
///
/// - [`ValidJson`]: JSON body deserialized and validated with `validator`
/// - [`TaskPayload`]: task input sent either as JSON or as multipart form data
///   with attached files
/// - [`BoundTask`]: the task named by the `:id` path segment, or 404
///
/// # Multipart layout
///
/// ```text
/// data               JSON object with the regular task fields
/// attachments[]      file, repeatable (`attachments` also accepted)
/// del_attachments[]  filename to remove, repeatable
/// <other>            plain text field, overridden by the same key in `data`
/// ```

use axum::{
    async_trait,
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartError},
        rejection::{BytesRejection, JsonRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::{header, request::Parts, StatusCode},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::{Map, Value};
use tasklist_shared::{
    models::task::Task,
    storage::{Upload, MAX_ATTACHMENT_BYTES},
};
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};

/// JSON body that has passed validation
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;

        value.validate()?;
        Ok(ValidJson(value))
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(e) => ApiError::validation("body", e.body_text()),
        JsonRejection::JsonSyntaxError(e) => ApiError::BadRequest(e.body_text()),
        JsonRejection::MissingJsonContentType(e) => ApiError::UnsupportedMediaType(e.body_text()),
        other => status_error(other.status(), other.body_text()),
    }
}

fn status_error(status: StatusCode, message: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(message)
    } else {
        ApiError::BadRequest(message)
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    status_error(err.status(), format!("Invalid multipart payload: {}", err.body_text()))
}

fn bytes_rejection(rejection: BytesRejection) -> ApiError {
    status_error(rejection.status(), rejection.body_text())
}

/// Task input plus any files uploaded with it
#[derive(Debug, Clone)]
pub struct TaskPayload<T> {
    /// Validated task fields
    pub input: T,

    /// Uploaded files in the order they were sent
    pub uploads: Vec<Upload>,
}

#[async_trait]
impl<S, T> FromRequest<S> for TaskPayload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());

        let (fields, uploads) = match content_type.as_deref() {
            Some(ct) if ct.starts_with("multipart/form-data") => {
                let multipart = Multipart::from_request(req, state)
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                read_multipart(multipart).await?
            }
            ct => {
                let body = Bytes::from_request(req, state).await.map_err(bytes_rejection)?;
                (read_json_object(ct, &body)?, Vec::new())
            }
        };

        let input: T = serde_json::from_value(Value::Object(fields))
            .map_err(|e| ApiError::validation("body", e.to_string()))?;
        input.validate()?;

        Ok(TaskPayload { input, uploads })
    }
}

/// Parses a JSON object body; an empty body counts as `{}`
fn read_json_object(content_type: Option<&str>, body: &[u8]) -> ApiResult<Map<String, Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    if let Some(ct) = content_type {
        let mime = ct.split(';').next().unwrap_or_default().trim();
        if mime != "application/json" && !mime.ends_with("+json") {
            return Err(ApiError::UnsupportedMediaType(
                "Expected request with `Content-Type: application/json` or `multipart/form-data`"
                    .to_string(),
            ));
        }
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::validation("body", "The request body must be a JSON object.")),
        Err(e) => Err(ApiError::BadRequest(format!("Malformed JSON body: {}", e))),
    }
}

/// Collects the fields and files of a multipart task request
async fn read_multipart(mut multipart: Multipart) -> ApiResult<(Map<String, Value>, Vec<Upload>)> {
    let mut fields = Map::new();
    let mut data: Option<Map<String, Value>> = None;
    let mut removals: Vec<Value> = Vec::new();
    let mut uploads: Vec<Upload> = Vec::new();
    let mut file_errors: Vec<ValidationErrorDetail> = Vec::new();
    let mut file_index = 0usize;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "attachments" | "attachments[]" => {
                let key = format!("attachments.{}", file_index);
                file_index += 1;

                let original_name = field.file_name().map(str::to_string);
                let content = field.bytes().await.map_err(multipart_error)?;

                match original_name {
                    // Empty file input
                    Some(ref n) if n.is_empty() && content.is_empty() => {}
                    None => file_errors.push(ValidationErrorDetail::new(
                        key.clone(),
                        format!("The {} field must be a file.", key),
                    )),
                    Some(_) if content.len() > MAX_ATTACHMENT_BYTES => {
                        file_errors.push(ValidationErrorDetail::new(
                            key.clone(),
                            format!(
                                "The {} field must not be greater than {} kilobytes.",
                                key,
                                MAX_ATTACHMENT_BYTES / 1024
                            ),
                        ))
                    }
                    Some(_) => uploads.push(Upload::new(original_name, content)),
                }
            }
            "data" => {
                let text = field.text().await.map_err(multipart_error)?;
                match serde_json::from_str::<Value>(&text) {
                    Ok(Value::Object(map)) => data = Some(map),
                    Ok(_) => {
                        return Err(ApiError::validation("data", "The data field must be a JSON object."))
                    }
                    Err(e) => {
                        return Err(ApiError::validation(
                            "data",
                            format!("The data field must be valid JSON: {}", e),
                        ))
                    }
                }
            }
            "del_attachments" | "del_attachments[]" => {
                removals.push(Value::String(field.text().await.map_err(multipart_error)?));
            }
            "" => {}
            other => {
                let key = other.to_string();
                let text = field.text().await.map_err(multipart_error)?;
                fields.insert(key, Value::String(text));
            }
        }
    }

    if !file_errors.is_empty() {
        return Err(ApiError::ValidationError(file_errors));
    }

    if let Some(data) = data {
        fields.extend(data);
    }

    if !removals.is_empty() {
        match fields.get_mut("del_attachments") {
            Some(Value::Array(list)) => list.extend(removals),
            _ => {
                fields.insert("del_attachments".to_string(), Value::Array(removals));
            }
        }
    }

    Ok((fields, uploads))
}

/// Deserializes a loosely typed boolean flag
///
/// Accepts `true`, `false`, `1`, `0`, `"1"`, `"0"`, `"true"`, `"false"` and
/// `null` (false). Use with `#[serde(default)]` so an absent key stays `None`.
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Value::deserialize(deserializer)?;
    let flag = match &value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) if n.as_i64() == Some(1) => true,
        Value::Number(n) if n.as_i64() == Some(0) => false,
        Value::String(s) if s == "1" || s == "true" => true,
        Value::String(s) if s == "0" || s == "false" || s.is_empty() => false,
        _ => return Err(D::Error::custom("The completed field must be true or false.")),
    };

    Ok(Some(flag))
}

/// Task named by the `:id` path segment
///
/// Rejects with 404 when the id is unknown or not a UUID.
#[derive(Debug, Clone)]
pub struct BoundTask(pub Task);

#[async_trait]
impl FromRequestParts<AppState> for BoundTask {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path(key) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::task_not_found())?;

        let task = Task::find_by_key(&state.db, &key)
            .await?
            .ok_or_else(ApiError::task_not_found)?;

        Ok(BoundTask(task))
    }
}
