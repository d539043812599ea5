use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    auth::{dto::Acknowledgement, repo::User},
    error::ApiError,
    extract::parse_id,
    state::AppState,
};

const NOT_FOUND: &str = "User not found";

#[derive(Debug, Serialize)]
pub struct UserList {
    pub ok: bool,
    pub users: Vec<User>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", delete(delete_user))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UserList>, ApiError> {
    let users = state.users.list().await?;
    Ok(Json(UserList { ok: true, users }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Acknowledgement>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    if !state.users.delete(id).await? {
        return Err(ApiError::not_found(NOT_FOUND));
    }
    info!(user_id = %id, "user deleted");
    Ok(Json(Acknowledgement::ok("User deleted")))
}
