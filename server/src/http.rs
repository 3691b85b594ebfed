//! HTTP routes of the rooms backend, mounted under `/api`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use comms::{
    http::{
        CreateRoomRequest, CreateRoomResponse, ErrorResponse, HealthResponse, MessagesResponse,
        PostMessageRequest, PostMessageResponse,
    },
    room::RoomValue,
};
use thiserror::Error;
use tracing::debug;

use crate::room_manager::{RoomError, RoomManager};

pub type AppResult<T> = Result<T, ApiError>;

/// Every failed request is answered with a status and an `{ "error": ... }` body
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("room '{0}' not found")]
    NotFound(String),
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::NotFound(room_id) => ApiError::NotFound(room_id),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        debug!(%status, error = %self, "request failed");

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn app(room_manager: Arc<RoomManager>) -> Router {
    Router::new().nest("/api", routes(room_manager))
}

fn routes(room_manager: Arc<RoomManager>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/rooms", post(create_room))
        .route("/rooms/:id", get(get_room))
        .route("/rooms/:id/messages", get(list_messages).post(post_message))
        .with_state(room_manager)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

async fn create_room(
    State(room_manager): State<Arc<RoomManager>>,
    payload: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CreateRoomResponse>)> {
    let Json(request) = payload?;
    let owner = request.owner.trim();
    if owner.is_empty() {
        return Err(ApiError::BadRequest("missing owner".into()));
    }

    let room_id = room_manager.create_room(owner).await;

    Ok((StatusCode::CREATED, Json(CreateRoomResponse { room_id })))
}

async fn get_room(
    State(room_manager): State<Arc<RoomManager>>,
    Path(room_id): Path<String>,
) -> AppResult<Json<RoomValue>> {
    room_manager
        .room_value(&room_id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound(room_id))
}

async fn list_messages(
    State(room_manager): State<Arc<RoomManager>>,
    Path(room_id): Path<String>,
) -> AppResult<Json<MessagesResponse>> {
    room_manager
        .messages(&room_id)
        .await
        .map(|messages| Json(MessagesResponse { messages }))
        .ok_or(ApiError::NotFound(room_id))
}

async fn post_message(
    State(room_manager): State<Arc<RoomManager>>,
    Path(room_id): Path<String>,
    payload: Result<Json<PostMessageRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<PostMessageResponse>)> {
    let Json(request) = payload?;
    if request.from.trim().is_empty() {
        return Err(ApiError::BadRequest("missing from".into()));
    }
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("missing message".into()));
    }

    let id = room_manager
        .post_message(&room_id, &request.from, &request.message)
        .await?;

    Ok((StatusCode::CREATED, Json(PostMessageResponse { id })))
}
