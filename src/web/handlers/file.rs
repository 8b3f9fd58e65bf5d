//! Folder and file handlers.

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::file::{ListView, SortKey, UploadItem};
use crate::web::dto::{
    ApiResponse, CreateFolderRequest, DeleteResponse, FileResponse, FolderResponse, ListQuery,
    ListingResponse, OwnerQuery, RenameFileRequest, SearchQuery, SearchResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::{AuthUser, JwtClaims};

use super::AppState;

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Control characters are dropped. Names that are not plain ASCII get an
/// ASCII fallback plus an RFC 5987 `filename*` parameter.
fn content_disposition_header(filename: &str) -> String {
    let plain = filename
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\');
    if plain {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let fallback: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    let cleaned: String = filename.chars().filter(|c| !c.is_control()).collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(&cleaned)
    )
}

fn listing_options(query: &ListQuery) -> (SortKey, ListView) {
    let sort = query
        .sort
        .as_deref()
        .and_then(|s| {
            s.parse::<SortKey>()
                .map_err(|e| tracing::debug!("Falling back to name order: {}", e))
                .ok()
        })
        .unwrap_or_default();
    let view = query
        .view
        .as_deref()
        .and_then(|v| {
            v.parse::<ListView>()
                .map_err(|e| tracing::debug!("Falling back to grid view: {}", e))
                .ok()
        })
        .unwrap_or_default();
    (sort, view)
}

/// Collect every `file` part of an upload form.
async fn read_upload_items(mut multipart: Multipart) -> Result<Vec<UploadItem>, ApiError> {
    let mut items = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::debug!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let Some(filename) = field.file_name().map(str::to_string) else {
            return Err(ApiError::bad_request("File part without a filename"));
        };
        let content = field.bytes().await.map_err(|e| {
            tracing::debug!("Failed to read file content: {}", e);
            ApiError::bad_request("Failed to read file")
        })?;

        items.push(UploadItem::new(filename, content.to_vec()));
    }

    Ok(items)
}

/// GET /api/files - List the root of a storage tree.
pub async fn list_root(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<ListingResponse>>, ApiError> {
    let (sort, view) = listing_options(&query);
    let scope = state.scope(&claims, query.user_id).await?;

    let listing = state.files().list_children(&scope, None, sort, view).await?;

    Ok(Json(ApiResponse::new(listing.into())))
}

/// GET /api/folder/:id - List one folder, with breadcrumbs.
pub async fn list_folder(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(folder_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<ListingResponse>>, ApiError> {
    let (sort, view) = listing_options(&query);
    let scope = state.scope(&claims, query.user_id).await?;

    let listing = state
        .files()
        .list_children(&scope, Some(folder_id), sort, view)
        .await?;

    Ok(Json(ApiResponse::new(listing.into())))
}

async fn create_folder_in(
    state: &AppState,
    claims: &JwtClaims,
    owner: OwnerQuery,
    parent_id: Option<i64>,
    req: CreateFolderRequest,
) -> Result<(StatusCode, Json<ApiResponse<FolderResponse>>), ApiError> {
    let scope = state.scope(claims, owner.user_id).await?;
    let folder = state
        .files()
        .create_folder(&scope, &req.name, parent_id)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(folder.into()))))
}

/// POST /api/create-folder - Create a folder at the root.
pub async fn create_root_folder(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(owner): Query<OwnerQuery>,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FolderResponse>>), ApiError> {
    create_folder_in(&state, &claims, owner, None, req).await
}

/// POST /api/create-folder/:parent_id - Create a subfolder.
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(parent_id): Path<i64>,
    Query(owner): Query<OwnerQuery>,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FolderResponse>>), ApiError> {
    create_folder_in(&state, &claims, owner, Some(parent_id), req).await
}

async fn upload_into(
    state: &AppState,
    claims: &JwtClaims,
    owner: OwnerQuery,
    folder_id: Option<i64>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Vec<FileResponse>>>), ApiError> {
    let scope = state.scope(claims, owner.user_id).await?;
    let items = read_upload_items(multipart).await?;

    let files = state.files().upload_files(&scope, items, folder_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(files.into_iter().map(Into::into).collect())),
    ))
}

/// POST /api/upload-file - Upload files to the root.
///
/// Request body: multipart/form-data with one or more `file` parts.
pub async fn upload_root_files(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(owner): Query<OwnerQuery>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Vec<FileResponse>>>), ApiError> {
    upload_into(&state, &claims, owner, None, multipart).await
}

/// POST /api/upload-file/:folder_id - Upload files into a folder.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(folder_id): Path<i64>,
    Query(owner): Query<OwnerQuery>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Vec<FileResponse>>>), ApiError> {
    upload_into(&state, &claims, owner, Some(folder_id), multipart).await
}

/// POST /api/delete-folder/:id - Delete a folder and everything under it.
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(folder_id): Path<i64>,
) -> Result<Json<ApiResponse<DeleteResponse>>, ApiError> {
    let scope = state.scope(&claims, None).await?;
    let removed = state.files().delete_folder(&scope, folder_id).await?;

    Ok(Json(ApiResponse::new(DeleteResponse {
        id: folder_id,
        removed,
    })))
}

/// POST /api/files/delete/:id - Delete a file.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<DeleteResponse>>, ApiError> {
    let scope = state.scope(&claims, None).await?;
    state.files().delete_file(&scope, file_id).await?;

    Ok(Json(ApiResponse::new(DeleteResponse {
        id: file_id,
        removed: 1,
    })))
}

/// POST /api/edit-file/:id - Rename a file.
pub async fn edit_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(file_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<RenameFileRequest>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let scope = state.scope(&claims, None).await?;
    let file = state.files().rename_file(&scope, file_id, &req.name).await?;

    Ok(Json(ApiResponse::new(file.into())))
}

/// GET /api/download-file/:id - Download a file as an attachment.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Response<Body>, ApiError> {
    let scope = state.scope(&claims, None).await?;
    let download = state.files().download_file(&scope, file_id).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&download.metadata.name),
        )
        .header(header::CONTENT_LENGTH, download.content.len())
        .body(Body::from(download.content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// GET /api/search?q= - Search folder and file names.
pub async fn search(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<SearchResponse>>, ApiError> {
    let scope = state.scope(&claims, query.user_id).await?;
    let results = state.files().search(&scope, &query.q).await?;

    Ok(Json(ApiResponse::new(results.into())))
}

/// GET /api/recent - Most recently uploaded files.
pub async fn recent_files(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let scope = state.scope(&claims, owner.user_id).await?;
    let files = state.files().recent_files(&scope).await?;

    Ok(Json(ApiResponse::new(
        files.into_iter().map(Into::into).collect(),
    )))
}
