//! Account and session handlers.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use picbase_core::{
    validate_signup, NewUser, SessionRepository, SignupInput, User, UserRepository,
};
use picbase_crypto::{generate_token, hash_password_with, hash_token, verify_password};

use super::ErrorBody;
use crate::{ApiError, AppState, RequireAuth};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    /// When present it must equal `password`.
    pub confirm_password: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header. Shown only once.
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, "Password task failed");
        ApiError::Internal("Internal server error".to_string())
    })
}

/// Create an account.
///
/// # Returns
/// - 201 Created with the public profile
/// - 400 Bad Request when a field fails validation
/// - 409 Conflict when the username or email is taken
#[utoipa::path(post, path = "/api/v1/auth/signup", tag = "Auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Invalid signup form", body = ErrorBody),
        (status = 409, description = "Username or email taken", body = ErrorBody),
    ))]
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();
    let full_name = req.full_name.trim().to_string();

    validate_signup(&SignupInput {
        username: &username,
        email: &email,
        full_name: &full_name,
        password: &req.password,
        confirm_password: req.confirm_password.as_deref(),
    })?;

    let params = state.config.password_params.clone();
    let password = req.password;
    let password_hash = blocking(move || hash_password_with(&password, &params)).await??;

    let user = state
        .db
        .users
        .insert(NewUser {
            username,
            email,
            full_name,
            password_hash,
        })
        .await?;

    info!(
        subsystem = "auth",
        op = "signup",
        user_id = %user.id,
        "Account created"
    );
    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in and receive a bearer token.
///
/// Unknown usernames and wrong passwords get the same answer.
#[utoipa::path(post, path = "/api/v1/auth/login", tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created", body = LoginResponse),
        (status = 401, description = "Invalid username or password", body = ErrorBody),
        (status = 403, description = "Account deactivated", body = ErrorBody),
        (status = 429, description = "Too many login attempts", body = ErrorBody),
    ))]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let username = req.username.trim();
    let Some(credentials) = state.db.users.find_credentials(username).await? else {
        warn!(subsystem = "auth", op = "login", "Login failed: unknown user");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    let password = req.password;
    let stored = credentials.password_hash.clone();
    if !blocking(move || verify_password(&password, &stored)).await?? {
        warn!(
            subsystem = "auth",
            op = "login",
            user_id = %credentials.user.id,
            "Login failed: wrong password"
        );
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let user = credentials.user;
    if !user.is_active {
        return Err(ApiError::Forbidden("Account is deactivated".to_string()));
    }

    let token = generate_token();
    let session = state
        .db
        .sessions
        .create(user.id, &hash_token(&token), state.config.session_ttl)
        .await?;
    state.db.users.touch_last_login(user.id).await?;
    let user = state.db.users.get(user.id).await?.unwrap_or(user);

    info!(
        subsystem = "auth",
        op = "login",
        user_id = %user.id,
        expires_at = %session.expires_at,
        "Session created"
    );

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_at: session.expires_at,
        user,
    }))
}

/// End the presenting session.
#[utoipa::path(post, path = "/api/v1/auth/logout", tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Session ended"),
        (status = 401, description = "Not authenticated", body = ErrorBody),
    ))]
pub async fn logout(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<StatusCode, ApiError> {
    state.db.sessions.deactivate(&auth.token_hash).await?;
    info!(
        subsystem = "auth",
        op = "logout",
        user_id = %auth.user.id,
        "Session ended"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Current user's profile.
#[utoipa::path(get, path = "/api/v1/auth/me", tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = ErrorBody),
    ))]
pub async fn me(auth: RequireAuth) -> Json<User> {
    Json(auth.user)
}
