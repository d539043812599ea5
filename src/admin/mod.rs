mod guard;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument};

use crate::{auth::repo::UserStats, error::ApiError, state::AppState};

pub use guard::AdminUser;

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub ok: bool,
    pub stats: UserStats,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

#[instrument(skip(state, admin))]
pub async fn dashboard(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Result<Json<Dashboard>, ApiError> {
    let since = OffsetDateTime::now_utc() - Duration::days(7);
    let stats = state.users.stats(since).await?;
    info!(admin_id = %admin.0.id, "dashboard viewed");
    Ok(Json(Dashboard { ok: true, stats }))
}
