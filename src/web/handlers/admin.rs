//! Administrator handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::auth::require_admin;
use crate::db::{Role, UserRepository};
use crate::file::{FileRepository, FolderRepository};
use crate::web::dto::{ApiResponse, UserListResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/admin/users - Members whose storage an administrator can open.
///
/// Each entry carries folder and file counts so the dashboard can link
/// into the tree with `?user_id=`.
pub async fn admin_list_users(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<Vec<UserListResponse>>>, ApiError> {
    let actor = state.current_user(&claims).await?;
    require_admin(&actor)?;

    let members = UserRepository::new(state.db.pool())
        .list_by_role(Role::Member)
        .await?;

    let folders = FolderRepository::new(state.db.pool());
    let files = FileRepository::new(state.db.pool());

    let mut users = Vec::with_capacity(members.len());
    for member in members {
        let folder_count = folders.count_by_owner(member.id).await?;
        let file_count = files.count_by_owner(member.id).await?;
        users.push(UserListResponse::new(member, folder_count, file_count));
    }

    Ok(Json(ApiResponse::new(users)))
}
