//! The HTTP front end: a thin JSON adapter over [`WorkerStore`].
//!
//! * `POST /add` takes a task, returns the queued job record.
//! * `GET /get` returns every job: queued, then working, then done.
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::ValidationError;
use crate::store::WorkerStore;
use crate::types::task::Task;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("malformed task: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("failed to serialise response: {0}")]
    Serialise(#[source] serde_json::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Malformed(_) | Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::Serialise(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, "rejected request");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Builds the router, with `store` injected as shared state.
pub fn router(store: WorkerStore) -> Router {
    Router::new()
        .route("/add", post(add_task))
        .route("/get", get(list_tasks))
        .with_state(store)
}

/// Serves the API on `listener` until `cancel` fires, then finishes any
/// in-flight requests and returns.
pub async fn serve(
    listener: TcpListener,
    store: WorkerStore,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "serving HTTP");

    axum::serve(listener, router(store))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}

// The body is taken raw rather than through `Json` so that any content type
// is accepted and every decoding failure maps to 400.
async fn add_task(
    State(store): State<WorkerStore>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let task: Task =
        serde_json::from_slice(&body).map_err(ApiError::Malformed)?;
    task.validate()?;

    let job = store.enqueue(task).await;
    info!(count = task.count, position = ?job.queue_position, "task added");

    json_response(&job)
}

async fn list_tasks(
    State(store): State<WorkerStore>,
) -> Result<Response, ApiError> {
    json_response(&store.list_all().await)
}

fn json_response<T: Serialize>(value: &T) -> Result<Response, ApiError> {
    let body = serde_json::to_vec(value).map_err(ApiError::Serialise)?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}
