//! Registration, login and session endpoints

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use common::validation::ValidatedJson;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{
        NewUser, RefreshTokenSchema, UserCredentialsSchema, UserRegistrationSchema, UserResponse,
    },
    session::TokenPair,
    state::AppState,
};

/// Response for token issuance
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer",
            expires_in: pair.expires_in,
        }
    }
}

/// Response for user login
#[derive(Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenResponse,
    pub user: UserResponse,
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(registration): ValidatedJson<UserRegistrationSchema>,
) -> ApiResult<impl IntoResponse> {
    info!("Registration attempt for {}", registration.email);

    let hasher = state.password_hasher.clone();
    let new_user = tokio::task::spawn_blocking(move || NewUser::new(registration, &hasher))
        .await
        .map_err(|e| ApiError::internal("Password hashing task failed", e))??;

    let user = state.users.create(&new_user).await.inspect_err(|e| {
        warn!("Registration for {} rejected: {}", new_user.email(), e);
    })?;

    info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Exchange credentials for tokens
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(credentials): ValidatedJson<UserCredentialsSchema>,
) -> ApiResult<impl IntoResponse> {
    if !state.login_limiter.is_allowed(&credentials.email).await {
        warn!("Login rate limit hit for {}", credentials.email);
        return Err(ApiError::TooManyRequests);
    }

    let user = state
        .users
        .find_by_email(&credentials.email)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let password = credentials.password;
    let candidate = user.clone();
    let valid = tokio::task::spawn_blocking(move || candidate.validate_password(&password))
        .await
        .map_err(|e| ApiError::internal("Password verification task failed", e))?;

    if !valid {
        warn!("Wrong password for user {}", user.id);
        return Err(ApiError::Unauthorized);
    }

    state.login_limiter.reset(&credentials.email).await;

    let tokens = state.sessions.issue(user.id).await?;
    info!("User {} logged in", user.id);

    Ok(Json(LoginResponse {
        tokens: tokens.into(),
        user: UserResponse::from(&user),
    }))
}

/// Rotate a refresh token
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RefreshTokenSchema>,
) -> ApiResult<impl IntoResponse> {
    let tokens = state.sessions.refresh(&body.refresh_token).await?;
    Ok(Json(TokenResponse::from(tokens)))
}

/// Revoke the refresh token, and the access token when one is sent along
pub async fn logout(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    ValidatedJson(body): ValidatedJson<RefreshTokenSchema>,
) -> ApiResult<impl IntoResponse> {
    let access_token = bearer
        .as_ref()
        .map(|TypedHeader(Authorization(bearer))| bearer.token());

    state
        .sessions
        .revoke(&body.refresh_token, access_token)
        .await?;

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

/// The authenticated user's profile
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<impl IntoResponse> {
    let user = state
        .users
        .find_by_id(user.id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(UserResponse::from(&user)))
}
