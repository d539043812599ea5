use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::dto::Acknowledgement,
    error::ApiError,
    extract::{parse_id, AppJson},
    packages::{
        dto::{CreatePackageRequest, PackageEnvelope, PackageList, UpdatePackageRequest},
        repo::{NewPackage, PackagePatch},
    },
    state::AppState,
};

const NOT_FOUND: &str = "Package not found";

pub fn package_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_packages).post(create_package))
        .route("/:id", put(update_package).delete(delete_package))
}

#[instrument(skip(state))]
pub async fn list_packages(State(state): State<AppState>) -> Result<Json<PackageList>, ApiError> {
    let packages = state.packages.list().await?;
    Ok(Json(PackageList { ok: true, packages }))
}

#[instrument(skip(state, payload))]
pub async fn create_package(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreatePackageRequest>,
) -> Result<(StatusCode, Json<PackageEnvelope>), ApiError> {
    let new = NewPackage::try_from(payload).inspect_err(|e| warn!(error = %e, "invalid package"))?;
    let package = state.packages.create(new).await?;
    info!(package_id = %package.id, destination = %package.destination, "package created");
    Ok((
        StatusCode::CREATED,
        Json(PackageEnvelope { ok: true, package }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdatePackageRequest>,
) -> Result<Json<PackageEnvelope>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    let patch = PackagePatch::try_from(payload)?;
    let package = state
        .packages
        .update(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    info!(package_id = %package.id, "package updated");
    Ok(Json(PackageEnvelope { ok: true, package }))
}

#[instrument(skip(state))]
pub async fn delete_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Acknowledgement>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    if !state.packages.delete(id).await? {
        return Err(ApiError::not_found(NOT_FOUND));
    }
    info!(package_id = %id, "package deleted");
    Ok(Json(Acknowledgement::ok("Package deleted")))
}
