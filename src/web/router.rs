//! Router configuration for the JSON API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    admin_list_users, create_folder, create_root_folder, delete_file, delete_folder,
    download_file, edit_file, list_folder, list_root, login, me, recent_files, register, search,
    upload_files, upload_root_files, AppState,
};
use super::middleware::{create_cors_layer, jwt_auth, JwtState};

/// Files accepted in one upload request, used to size the body limit.
const MAX_FILES_PER_UPLOAD: usize = 16;

/// Allowance for multipart headers and boundaries.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: &[String],
) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me));

    let per_file = usize::try_from(app_state.max_upload_size).unwrap_or(usize::MAX);
    let upload_limit = per_file
        .saturating_mul(MAX_FILES_PER_UPLOAD)
        .saturating_add(MULTIPART_OVERHEAD);

    let upload_routes = Router::new()
        .route("/upload-file", post(upload_root_files))
        .route("/upload-file/:folder_id", post(upload_files))
        .layer(DefaultBodyLimit::max(upload_limit));

    let storage_routes = Router::new()
        .route("/files", get(list_root))
        .route("/folder/:id", get(list_folder))
        .route("/create-folder", post(create_root_folder))
        .route("/create-folder/:parent_id", post(create_folder))
        .route("/delete-folder/:id", post(delete_folder))
        .route("/files/delete/:id", post(delete_file))
        .route("/edit-file/:id", post(edit_file))
        .route("/download-file/:id", get(download_file))
        .route("/search", get(search))
        .route("/recent", get(recent_files))
        .merge(upload_routes);

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .route("/admin/users", get(admin_list_users))
        .merge(storage_routes);

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    jwt_auth(jwt_state.clone(), req, next)
                })),
        )
        .with_state(app_state)
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
