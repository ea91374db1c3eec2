// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use curatarr_application::{AppState, CatalogAlbum, CatalogSyncError, ManualDecisionError};
use curatarr_domain::{describe_validation_errors, Artist, ArtistId, Validate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use super::albums::AlbumResponse;
use super::{api_error, internal_error, parse_id, ApiError, ErrorResponse};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ArtistResponse {
    pub id: String,
    pub name: String,
    pub foreign_artist_id: Option<String>,
    pub folder_link: Option<String>,
}

impl From<Artist> for ArtistResponse {
    fn from(artist: Artist) -> Self {
        Self {
            id: artist.id.to_string(),
            name: artist.name,
            foreign_artist_id: artist.foreign_artist_id,
            folder_link: artist.folder_link,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateArtistRequest {
    pub name: String,
    pub foreign_artist_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LinkFolderRequest {
    /// Root-relative folder, `null` removes the link.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CatalogAlbumRequest {
    pub foreign_album_id: String,
    pub title: String,
    pub release_year: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportAlbumsRequest {
    pub albums: Vec<CatalogAlbumRequest>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImportAlbumsResponse {
    pub received: usize,
    pub inserted: usize,
    pub refreshed: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create an artist
#[utoipa::path(
    post,
    path = "/api/v1/artists",
    request_body = CreateArtistRequest,
    responses(
        (status = 201, description = "Artist created", body = ArtistResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "artists"
)]
pub async fn create_artist(
    State(state): State<AppState>,
    Json(request): Json<CreateArtistRequest>,
) -> Result<(StatusCode, Json<ArtistResponse>), ApiError> {
    debug!(target: "api", ?request, "creating artist");

    let mut artist = Artist::new(request.name.trim());
    artist.foreign_artist_id = request.foreign_artist_id;
    artist
        .validate()
        .map_err(|errors| api_error(StatusCode::BAD_REQUEST, describe_validation_errors(&errors)))?;

    let artist = state.artists.create(artist).await.map_err(internal_error)?;
    Ok((StatusCode::CREATED, Json(ArtistResponse::from(artist))))
}

/// Get a single artist by ID
#[utoipa::path(
    get,
    path = "/api/v1/artists/{id}",
    params(
        ("id" = String, Path, description = "Artist ID")
    ),
    responses(
        (status = 200, description = "Artist found", body = ArtistResponse),
        (status = 404, description = "Artist not found", body = ErrorResponse)
    ),
    tag = "artists"
)]
pub async fn get_artist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ArtistResponse>, ApiError> {
    debug!(target: "api", %id, "fetching artist");
    let artist_id: ArtistId = parse_id(&id, "artist")?;

    state
        .artists
        .get_by_id(artist_id)
        .await
        .map_err(internal_error)?
        .map(|artist| Json(ArtistResponse::from(artist)))
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Artist {id} not found")))
}

/// Link an artist to a folder chosen by hand, or remove the link
#[utoipa::path(
    put,
    path = "/api/v1/artists/{id}/folder",
    params(
        ("id" = String, Path, description = "Artist ID")
    ),
    request_body = LinkFolderRequest,
    responses(
        (status = 200, description = "Link stored", body = ArtistResponse),
        (status = 400, description = "Folder does not exist", body = ErrorResponse),
        (status = 403, description = "Path escapes the library root", body = ErrorResponse),
        (status = 404, description = "Artist not found", body = ErrorResponse),
        (status = 503, description = "Library root not configured", body = ErrorResponse)
    ),
    tag = "artists"
)]
pub async fn link_artist_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<LinkFolderRequest>,
) -> Result<Json<ArtistResponse>, ApiError> {
    debug!(target: "api", %id, ?request, "linking artist folder");
    let artist_id: ArtistId = parse_id(&id, "artist")?;

    state
        .decisions
        .link_artist_folder(artist_id, request.path.as_deref())
        .await
        .map_err(decision_error)?;

    get_artist(State(state), Path(id)).await
}

/// List the catalog albums of an artist with their ownership state
#[utoipa::path(
    get,
    path = "/api/v1/artists/{id}/albums",
    params(
        ("id" = String, Path, description = "Artist ID")
    ),
    responses(
        (status = 200, description = "Albums of the artist", body = Vec<AlbumResponse>),
        (status = 404, description = "Artist not found", body = ErrorResponse)
    ),
    tag = "artists"
)]
pub async fn list_artist_albums(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AlbumResponse>>, ApiError> {
    let artist_id: ArtistId = parse_id(&id, "artist")?;
    if state
        .artists
        .get_by_id(artist_id)
        .await
        .map_err(internal_error)?
        .is_none()
    {
        return Err(api_error(StatusCode::NOT_FOUND, format!("Artist {id} not found")));
    }

    let albums = state
        .albums
        .get_by_artist(artist_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(albums.into_iter().map(AlbumResponse::from).collect()))
}

/// Import catalog albums for an artist
#[utoipa::path(
    put,
    path = "/api/v1/artists/{id}/albums",
    params(
        ("id" = String, Path, description = "Artist ID")
    ),
    request_body = ImportAlbumsRequest,
    responses(
        (status = 200, description = "Albums imported", body = ImportAlbumsResponse),
        (status = 400, description = "Invalid album", body = ErrorResponse),
        (status = 404, description = "Artist not found", body = ErrorResponse)
    ),
    tag = "artists"
)]
pub async fn import_artist_albums(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ImportAlbumsRequest>,
) -> Result<Json<ImportAlbumsResponse>, ApiError> {
    let artist_id: ArtistId = parse_id(&id, "artist")?;
    debug!(target: "api", %artist_id, count = request.albums.len(), "importing catalog albums");

    let albums = request
        .albums
        .into_iter()
        .map(|album| CatalogAlbum {
            foreign_album_id: album.foreign_album_id,
            title: album.title,
            release_year: album.release_year,
        })
        .collect();

    let summary = state
        .catalog
        .import_albums(artist_id, albums)
        .await
        .map_err(|err| match err {
            CatalogSyncError::ArtistNotFound(_) => api_error(StatusCode::NOT_FOUND, err.to_string()),
            CatalogSyncError::InvalidAlbum(_) | CatalogSyncError::MissingForeignId(_) => {
                api_error(StatusCode::BAD_REQUEST, err.to_string())
            }
            CatalogSyncError::Catalog(_) => api_error(StatusCode::BAD_GATEWAY, err.to_string()),
            CatalogSyncError::Repository(_) => internal_error(err),
        })?;

    Ok(Json(ImportAlbumsResponse {
        received: summary.received,
        inserted: summary.inserted,
        refreshed: summary.refreshed,
    }))
}

pub(crate) fn decision_error(err: ManualDecisionError) -> ApiError {
    match err {
        ManualDecisionError::Configuration(_) => {
            api_error(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        ManualDecisionError::Security(_) => {
            warn!(target: "api", error = %err, "rejected folder outside library root");
            api_error(StatusCode::FORBIDDEN, err.to_string())
        }
        ManualDecisionError::FolderNotFound(_) | ManualDecisionError::Validation(_) => {
            api_error(StatusCode::BAD_REQUEST, err.to_string())
        }
        ManualDecisionError::ArtistNotFound(_) | ManualDecisionError::AlbumNotFound(_) => {
            api_error(StatusCode::NOT_FOUND, err.to_string())
        }
        ManualDecisionError::Repository(_) => internal_error(err),
    }
}
