use axum::extract::FromRequest;

use crate::error::ApiError;

/// `Json` whose rejections come back as our JSON error body instead of plain text.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Path ids that don't parse can't name a stored record, so they read as not found.
pub fn parse_id(raw: &str, not_found: &str) -> Result<uuid::Uuid, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found(not_found))
}
