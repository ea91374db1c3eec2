// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use curatarr_application::AppState;
use curatarr_domain::{AlbumId, AlbumRecord, OwnershipStatus};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use super::artists::decision_error;
use super::{api_error, parse_id, ApiError, ErrorResponse};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AlbumResponse {
    pub id: String,
    pub artist_id: String,
    pub foreign_album_id: Option<String>,
    pub title: String,
    pub release_year: Option<i32>,
    /// `owned`, `missing` or `ambiguous`
    pub ownership_status: String,
    /// Relative to the library root.
    pub matched_folder_path: Option<String>,
    pub confidence: Option<f64>,
    pub manual_override: bool,
}

impl From<AlbumRecord> for AlbumResponse {
    fn from(album: AlbumRecord) -> Self {
        Self {
            id: album.id.to_string(),
            artist_id: album.artist_id.to_string(),
            foreign_album_id: album.foreign_album_id,
            title: album.title,
            release_year: album.release_year,
            ownership_status: album.ownership_status.to_string(),
            matched_folder_path: album.matched_folder_path,
            confidence: album.confidence,
            manual_override: album.manual_override,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetOwnershipRequest {
    pub status: String,
    pub path: Option<String>,
}

/// Set album ownership by hand; reconciliation will not change it afterwards
#[utoipa::path(
    put,
    path = "/api/v1/albums/{id}/ownership",
    params(
        ("id" = String, Path, description = "Album ID")
    ),
    request_body = SetOwnershipRequest,
    responses(
        (status = 200, description = "Ownership stored", body = AlbumResponse),
        (status = 400, description = "Invalid status or folder", body = ErrorResponse),
        (status = 403, description = "Path escapes the library root", body = ErrorResponse),
        (status = 404, description = "Album not found", body = ErrorResponse)
    ),
    tag = "albums"
)]
pub async fn set_album_ownership(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SetOwnershipRequest>,
) -> Result<Json<AlbumResponse>, ApiError> {
    debug!(target: "api", %id, ?request, "setting album ownership");
    let album_id: AlbumId = parse_id(&id, "album")?;
    let status: OwnershipStatus = request
        .status
        .parse()
        .map_err(|err| api_error(StatusCode::BAD_REQUEST, format!("{err}")))?;

    let album = state
        .decisions
        .set_album_ownership(album_id, status, request.path.as_deref())
        .await
        .map_err(decision_error)?;
    Ok(Json(AlbumResponse::from(album)))
}

/// Drop a manual decision so the next reconciliation pass decides again
#[utoipa::path(
    delete,
    path = "/api/v1/albums/{id}/ownership",
    params(
        ("id" = String, Path, description = "Album ID")
    ),
    responses(
        (status = 200, description = "Override cleared", body = AlbumResponse),
        (status = 404, description = "Album not found", body = ErrorResponse)
    ),
    tag = "albums"
)]
pub async fn clear_album_ownership(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AlbumResponse>, ApiError> {
    debug!(target: "api", %id, "clearing album override");
    let album_id: AlbumId = parse_id(&id, "album")?;
    let album = state
        .decisions
        .clear_album_override(album_id)
        .await
        .map_err(decision_error)?;
    Ok(Json(AlbumResponse::from(album)))
}
