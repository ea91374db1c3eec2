// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use curatarr_application::{AppState, BrowseError, BrowseListing};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::{IntoParams, ToSchema};

use super::{api_error, internal_error, ApiError, ErrorResponse};

#[derive(Debug, Deserialize, IntoParams)]
pub struct BrowseQuery {
    /// Root-relative directory; empty or absent lists the root.
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BrowseEntryResponse {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BrowseResponse {
    pub path: String,
    pub parent: Option<String>,
    pub entries: Vec<BrowseEntryResponse>,
}

impl From<BrowseListing> for BrowseResponse {
    fn from(listing: BrowseListing) -> Self {
        Self {
            path: listing.path,
            parent: listing.parent,
            entries: listing
                .entries
                .into_iter()
                .map(|entry| BrowseEntryResponse {
                    name: entry.name,
                    path: entry.path,
                })
                .collect(),
        }
    }
}

/// List the folders inside a library directory
#[utoipa::path(
    get,
    path = "/api/v1/library/browse",
    params(BrowseQuery),
    responses(
        (status = 200, description = "Directory listing", body = BrowseResponse),
        (status = 400, description = "Path is not a directory", body = ErrorResponse),
        (status = 403, description = "Path escapes the library root or is unreadable", body = ErrorResponse),
        (status = 404, description = "Path does not exist", body = ErrorResponse),
        (status = 503, description = "Library root not configured", body = ErrorResponse)
    ),
    tag = "library"
)]
pub async fn browse_library(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<BrowseResponse>, ApiError> {
    debug!(target: "api", path = %query.path, "browsing library");

    let browser = state.browser.clone();
    let listing = tokio::task::spawn_blocking(move || browser.browse(&query.path))
        .await
        .map_err(internal_error)?
        .map_err(browse_error)?;
    Ok(Json(BrowseResponse::from(listing)))
}

fn browse_error(err: BrowseError) -> ApiError {
    match err {
        BrowseError::Configuration(_) => api_error(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        BrowseError::Security(_) => {
            warn!(target: "api", error = %err, "rejected browse request");
            api_error(StatusCode::FORBIDDEN, err.to_string())
        }
        BrowseError::PermissionDenied(_) => api_error(StatusCode::FORBIDDEN, err.to_string()),
        BrowseError::NotFound(_) => api_error(StatusCode::NOT_FOUND, err.to_string()),
        BrowseError::NotADirectory(_) => api_error(StatusCode::BAD_REQUEST, err.to_string()),
        BrowseError::Io(_) => internal_error(err),
    }
}
