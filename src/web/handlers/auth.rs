//! Authentication handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::{register as register_user, RegistrationRequest};
use crate::auth::{hash_password, needs_rehash, verify_password};
use crate::db::{User, UserRepository, UserUpdate};
use crate::web::dto::{
    ApiResponse, LoginRequest, LoginResponse, MeResponse, RegisterRequest, UserInfo,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

use super::AppState;

fn login_response(state: &AppState, user: &User) -> Result<LoginResponse, ApiError> {
    Ok(LoginResponse {
        access_token: state.generate_access_token(user)?,
        token_type: "Bearer",
        expires_in: state.access_token_expiry,
        user: UserInfo::from(user),
    })
}

/// Re-hash a password whose stored hash predates the current parameters.
async fn upgrade_password_hash(repo: &UserRepository<'_>, user: &User, password: &str) {
    let hash = match hash_password(password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!(user_id = user.id, error = %e, "Failed to rehash password");
            return;
        }
    };

    match repo.update(user.id, &UserUpdate::new().password(hash)).await {
        Ok(_) => tracing::info!(user_id = user.id, "Upgraded stored password hash"),
        Err(e) => {
            tracing::warn!(user_id = user.id, error = %e, "Failed to store upgraded password hash")
        }
    }
}

/// POST /api/auth/login - User login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let repo = UserRepository::new(state.db.pool());

    let user = repo
        .get_by_username(&req.username)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    verify_password(&req.password, &user.password)
        .map_err(|_| ApiError::unauthorized("Invalid username or password"))?;

    if !user.is_active {
        return Err(ApiError::forbidden("Account is disabled"));
    }

    if needs_rehash(&user.password) {
        upgrade_password_hash(&repo, &user, &req.password).await;
    }

    if let Err(e) = repo.update_last_login(user.id).await {
        tracing::warn!(user_id = user.id, error = %e, "Failed to record last login");
    }

    tracing::info!(user_id = user.id, username = %user.username, "User logged in");

    Ok(Json(ApiResponse::new(login_response(&state, &user)?)))
}

/// POST /api/auth/register - User registration.
///
/// Creates the account and its profile, then logs the new user in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LoginResponse>>), ApiError> {
    let mut request = RegistrationRequest::new(req.username, req.password);
    if let Some(name) = req.display_name.filter(|n| !n.trim().is_empty()) {
        request = request.with_display_name(name);
    }
    if let Some(email) = req.email.filter(|e| !e.trim().is_empty()) {
        request = request.with_email(email);
    }

    let user = register_user(&UserRepository::new(state.db.pool()), request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(login_response(&state, &user)?)),
    ))
}

/// GET /api/auth/me - Get current user info.
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let user = state.current_user(&claims).await?;
    let profile = UserRepository::new(state.db.pool())
        .get_profile(user.id)
        .await?;

    Ok(Json(ApiResponse::new(MeResponse::new(user, profile))))
}
