// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use curatarr_application::{AppState, ReconcileError, ReconcileSummary};
use curatarr_domain::ArtistId;
use curatarr_library::ScanError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use super::{api_error, internal_error, parse_id, ApiError, ErrorResponse};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReconcileResponse {
    pub scanned_folders: usize,
    /// Albums found `owned` or `ambiguous`.
    pub matched: usize,
    pub missing: usize,
    pub ambiguous: usize,
    pub skipped_overrides: usize,
    pub permission_denied: usize,
    pub artist_folder: Option<String>,
}

impl From<ReconcileSummary> for ReconcileResponse {
    fn from(summary: ReconcileSummary) -> Self {
        Self {
            scanned_folders: summary.scanned_folders,
            matched: summary.matched,
            missing: summary.missing,
            ambiguous: summary.ambiguous,
            skipped_overrides: summary.skipped_overrides,
            permission_denied: summary.permission_denied,
            artist_folder: summary.artist_folder,
        }
    }
}

/// Match the artist's catalog albums against the library folders
#[utoipa::path(
    post,
    path = "/api/v1/artists/{id}/reconcile",
    params(
        ("id" = String, Path, description = "Artist ID")
    ),
    responses(
        (status = 200, description = "Pass complete", body = ReconcileResponse),
        (status = 403, description = "Linked folder escapes the library root", body = ErrorResponse),
        (status = 404, description = "Artist not found", body = ErrorResponse),
        (status = 409, description = "A pass for this artist is already running", body = ErrorResponse),
        (status = 503, description = "Library root missing or not configured", body = ErrorResponse)
    ),
    tag = "reconcile"
)]
pub async fn reconcile_artist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let artist_id: ArtistId = parse_id(&id, "artist")?;
    info!(target: "api", %artist_id, "reconciliation requested");

    let summary = state
        .reconciler
        .reconcile(artist_id)
        .await
        .map_err(reconcile_error)?;
    Ok(Json(ReconcileResponse::from(summary)))
}

fn reconcile_error(err: ReconcileError) -> ApiError {
    match err {
        ReconcileError::Configuration(_) => api_error(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        ReconcileError::ConcurrentOperation(_) => api_error(StatusCode::CONFLICT, err.to_string()),
        ReconcileError::ArtistNotFound(_) => api_error(StatusCode::NOT_FOUND, err.to_string()),
        ReconcileError::Security(_) | ReconcileError::Scan(ScanError::Security(_)) => {
            warn!(target: "api", error = %err, "reconciliation rejected by path guard");
            api_error(StatusCode::FORBIDDEN, err.to_string())
        }
        ReconcileError::Scan(_) => api_error(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        ReconcileError::Repository(_) | ReconcileError::Task(_) => internal_error(err),
    }
}
