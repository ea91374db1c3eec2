// SPDX-License-Identifier: GPL-3.0-or-later
pub mod handlers;

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use curatarr_application::AppState;
use handlers::albums::{
    clear_album_ownership, set_album_ownership, AlbumResponse, SetOwnershipRequest,
    __path_clear_album_ownership, __path_set_album_ownership,
};
use handlers::artists::{
    create_artist, get_artist, import_artist_albums, link_artist_folder, list_artist_albums,
    ArtistResponse, CatalogAlbumRequest, CreateArtistRequest, ImportAlbumsRequest,
    ImportAlbumsResponse, LinkFolderRequest, __path_create_artist, __path_get_artist,
    __path_import_artist_albums, __path_link_artist_folder, __path_list_artist_albums,
};
use handlers::library::{
    browse_library, BrowseEntryResponse, BrowseResponse, __path_browse_library,
};
use handlers::reconcile::{reconcile_artist, ReconcileResponse, __path_reconcile_artist};
use handlers::ErrorResponse;
use serde::Serialize;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Serialize, utoipa::ToSchema)]
struct HealthResponse {
    status: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
#[allow(dead_code)]
async fn health() -> Json<HealthResponse> {
    health_handler().await
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        create_artist,
        get_artist,
        link_artist_folder,
        list_artist_albums,
        import_artist_albums,
        reconcile_artist,
        set_album_ownership,
        clear_album_ownership,
        browse_library,
    ),
    components(
        schemas(
            HealthResponse,
            ArtistResponse,
            CreateArtistRequest,
            LinkFolderRequest,
            CatalogAlbumRequest,
            ImportAlbumsRequest,
            ImportAlbumsResponse,
            AlbumResponse,
            SetOwnershipRequest,
            ReconcileResponse,
            BrowseResponse,
            BrowseEntryResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "system", description = "System health and status endpoints"),
        (name = "artists", description = "Artists, folder links and catalog albums"),
        (name = "albums", description = "Manual ownership decisions"),
        (name = "reconcile", description = "Catalog to library reconciliation"),
        (name = "library", description = "Library folder browsing")
    ),
    info(
        title = "Curatarr API",
        version = "0.1.0",
        description = "Matches catalog albums against the folders of a music library",
    )
)]
pub struct ApiDoc;

pub fn router(state: AppState) -> Router {
    info!(target: "api", "building router");

    let api_v1 = Router::new()
        .route("/artists", post(create_artist))
        .route("/artists/:id", get(get_artist))
        .route("/artists/:id/folder", put(link_artist_folder))
        .route(
            "/artists/:id/albums",
            get(list_artist_albums).put(import_artist_albums),
        )
        .route("/artists/:id/reconcile", post(reconcile_artist))
        .route(
            "/albums/:id/ownership",
            put(set_album_ownership).delete(clear_album_ownership),
        )
        .route("/library/browse", get(browse_library));

    let openapi = ApiDoc::openapi();

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", api_v1)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", openapi))
        .with_state(state)
}
