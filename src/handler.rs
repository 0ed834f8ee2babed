use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::Value;
use tracing::info;

use crate::api::APIResponse;
use crate::db::Database;
use crate::error::{AuthError, SyncError};
use crate::model::{LoginUser, RegisterUser};
use crate::{auth, sync, unpack_error};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(healthcheck))
        .route("/users", post(register))
        .route("/login", post(login))
        .route("/sync-bookmarks", post(sync_bookmarks))
        .route("/bookmarks/:user_id", get(get_bookmarks))
}

fn bad_request(msg: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(APIResponse::message(msg))).into_response()
}

fn internal_error(msg: &str) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(APIResponse::message(msg))).into_response()
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(APIResponse::message("ok"))
}

pub async fn register(State(state): State<AppState>, Json(payload): Json<RegisterUser>) -> Response {
    if payload.name.is_empty()
        || payload.username.is_empty()
        || payload.email.is_empty()
        || payload.password.is_empty()
    {
        return bad_request("name, username, email and password are required");
    }

    match auth::create_user(&state.db, payload).await {
        Ok(user) => {
            info!(user_id = user.id, "user registered");
            (StatusCode::CREATED, Json(APIResponse::new("user created", user))).into_response()
        }
        Err(e @ AuthError::DuplicateField(_)) => {
            (StatusCode::CONFLICT, Json(APIResponse::message(&e.to_string()))).into_response()
        }
        Err(e) => {
            tracing::error!("failed to register user: {}", unpack_error(&e));
            internal_error("failed to register user")
        }
    }
}

pub async fn login(State(state): State<AppState>, Json(payload): Json<LoginUser>) -> Response {
    match auth::verify_login(&state.db, &payload.login, &payload.password).await {
        Ok(user) => {
            info!(user_id = user.id, "login ok");
            (StatusCode::OK, Json(APIResponse::new("login ok", user))).into_response()
        }
        Err(AuthError::InvalidCredentials) => (
            StatusCode::UNAUTHORIZED,
            Json(APIResponse::message("invalid credentials")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to verify login: {}", unpack_error(&e));
            internal_error("failed to verify login")
        }
    }
}

/// The `/sync-bookmarks` edge. The body is taken as raw JSON so the
/// coordinator owns the malformed-payload taxonomy instead of axum's
/// extractor.
pub async fn sync_bookmarks(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    match sync::sync(&state.db, &payload).await {
        Ok(ack) => (StatusCode::OK, Json(APIResponse::new("bookmarks synced", ack))).into_response(),
        Err(e @ SyncError::InvalidPayload(_)) => bad_request(&e.to_string()),
        Err(e) => {
            tracing::error!("bookmark sync failed: {}", unpack_error(&e));
            internal_error("failed to sync bookmarks")
        }
    }
}

pub async fn get_bookmarks(State(state): State<AppState>, Path(user_id): Path<i64>) -> Response {
    match state.db.bookmarks_for_user(user_id).await {
        Ok(bookmarks) => {
            (StatusCode::OK, Json(APIResponse::new("got bookmarks", bookmarks))).into_response()
        }
        Err(e) => {
            tracing::error!("failed to get bookmarks: {:#}", e);
            internal_error("failed to get bookmarks")
        }
    }
}
