// rest/routes/tasks.rs — task CRUD routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::rest::error::ApiError;
use crate::tasks::{parse_status, CreateTaskRequest, TaskRow, UpdateTaskRequest};
use crate::AppContext;

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskRow>), ApiError> {
    let new_task = body.validate()?;
    let task = ctx.storage.create_task(&new_task).await?;
    debug!(id = task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<String>,
}

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<TaskRow>>, ApiError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let tasks = ctx.storage.list_tasks(status).await?;
    Ok(Json(tasks))
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<Json<TaskRow>, ApiError> {
    match ctx.storage.get_task(id).await? {
        Some(task) => Ok(Json(task)),
        None => Err(ApiError::NotFound),
    }
}

pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<TaskRow>, ApiError> {
    let patch = body.validate()?;
    match ctx.storage.update_task(id, &patch).await? {
        Some(task) => {
            debug!(id = task.id, "task updated");
            Ok(Json(task))
        }
        None => Err(ApiError::NotFound),
    }
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if ctx.storage.delete_task(id).await? {
        debug!(id, "task deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
