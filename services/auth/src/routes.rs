//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use pomo_common::{
    AuthUser, DataResponse, TokenPair, TokenStore,
    web::{REFRESH_COOKIE, envelope_path},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{AuthError, AuthResult, OtpError, OtpResult},
    middleware::require_auth,
    models::{LoginCredentials, NewUser, UpdateUser},
    notifier::Notifier,
    repositories::UserStore,
    state::AppState,
    validation::{validate_email, validate_otp_code, validate_otp_reason, validate_password},
};

/// Response for token issuance
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

impl TokenResponse {
    fn new(tokens: TokenPair, expires_in: u64) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: "Bearer",
            expires_in,
        }
    }
}

/// Request for an OTP
#[derive(Debug, Deserialize)]
pub struct RequestOtpRequest {
    pub email: String,
    pub reason: String,
}

/// Request to verify an OTP
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

/// Create the router for the authentication service
pub fn create_router<U, S, N>(state: AppState<U, S, N>) -> Router
where
    U: UserStore,
    S: TokenStore,
    N: Notifier,
{
    let protected = Router::new()
        .route("/auth/logout", post(logout::<U, S, N>))
        .route("/auth/profile", get(profile::<U, S, N>))
        .route(
            "/users",
            get(list_users::<U, S, N>).post(create_user::<U, S, N>),
        )
        .route(
            "/users/:id",
            get(find_user::<U, S, N>)
                .patch(update_user::<U, S, N>)
                .delete(remove_user::<U, S, N>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth::<U, S, N>,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register::<U, S, N>))
        .route("/auth/login", post(login::<U, S, N>))
        .route("/auth/refresh", post(refresh::<U, S, N>))
        .route("/otp/request", post(request_otp::<U, S, N>))
        .route("/otp/verify", post(verify_otp::<U, S, N>))
        .merge(protected)
        .layer(middleware::from_fn(envelope_path))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, String> {
    payload.map(|Json(body)| body).map_err(|e| e.body_text())
}

fn path_id(id: Result<Path<Uuid>, PathRejection>) -> AuthResult<Uuid> {
    id.map(|Path(id)| id)
        .map_err(|e| AuthError::Validation(e.body_text()))
}

fn validate_new_user(new_user: &NewUser) -> AuthResult<()> {
    validate_email(&new_user.email).map_err(AuthError::Validation)?;
    validate_password(&new_user.password).map_err(AuthError::Validation)
}

/// User registration endpoint
pub async fn register<U: UserStore, S: TokenStore, N: Notifier>(
    State(state): State<AppState<U, S, N>>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> AuthResult<impl IntoResponse> {
    let new_user = json_body(payload).map_err(AuthError::Validation)?;
    validate_new_user(&new_user)?;

    let user = state
        .auth
        .register(&new_user.email, &new_user.password)
        .await?;
    Ok((StatusCode::CREATED, DataResponse::new(user)))
}

/// User login endpoint
pub async fn login<U: UserStore, S: TokenStore, N: Notifier>(
    State(state): State<AppState<U, S, N>>,
    jar: CookieJar,
    payload: Result<Json<LoginCredentials>, JsonRejection>,
) -> AuthResult<impl IntoResponse> {
    let credentials = json_body(payload).map_err(AuthError::Validation)?;
    validate_email(&credentials.email).map_err(AuthError::Validation)?;
    if credentials.password.is_empty() {
        return Err(AuthError::Validation("Password is required".to_string()));
    }

    let user = state
        .auth
        .validate_credentials(&credentials.email, &credentials.password)
        .await?;
    let tokens = state.auth.login(&user).await?;

    let jar = state.cookies.set_tokens(jar, &tokens);
    let expires_in = state.auth.jwt().access_token_expiry();
    Ok((jar, DataResponse::new(TokenResponse::new(tokens, expires_in))))
}

/// Refresh token endpoint; the token is read from the cookie only
pub async fn refresh<U: UserStore, S: TokenStore, N: Notifier>(
    State(state): State<AppState<U, S, N>>,
    jar: CookieJar,
) -> AuthResult<impl IntoResponse> {
    info!("Token refresh request");

    let presented = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());
    let tokens = state.auth.refresh(presented.as_deref()).await?;

    let jar = state.cookies.set_tokens(jar, &tokens);
    let expires_in = state.auth.jwt().access_token_expiry();
    Ok((jar, DataResponse::new(TokenResponse::new(tokens, expires_in))))
}

/// Logout endpoint
pub async fn logout<U: UserStore, S: TokenStore, N: Notifier>(
    State(state): State<AppState<U, S, N>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> AuthResult<impl IntoResponse> {
    state.auth.logout(user.id).await?;

    let jar = state.cookies.clear_tokens(jar);
    Ok((
        jar,
        DataResponse::new(serde_json::json!({"message": "Logged out successfully"})),
    ))
}

/// Authenticated user's own record
pub async fn profile<U: UserStore, S: TokenStore, N: Notifier>(
    State(state): State<AppState<U, S, N>>,
    Extension(user): Extension<AuthUser>,
) -> AuthResult<impl IntoResponse> {
    let user = state.auth.profile(user.id).await?;
    Ok(DataResponse::new(user))
}

pub async fn request_otp<U: UserStore, S: TokenStore, N: Notifier>(
    State(state): State<AppState<U, S, N>>,
    payload: Result<Json<RequestOtpRequest>, JsonRejection>,
) -> OtpResult<impl IntoResponse> {
    let request = json_body(payload).map_err(OtpError::Validation)?;
    validate_email(&request.email).map_err(OtpError::Validation)?;
    validate_otp_reason(&request.reason).map_err(OtpError::Validation)?;

    let sent = state
        .otp
        .request_otp(&request.email, &request.reason)
        .await?;
    Ok(DataResponse::new(sent))
}

pub async fn verify_otp<U: UserStore, S: TokenStore, N: Notifier>(
    State(state): State<AppState<U, S, N>>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> OtpResult<impl IntoResponse> {
    let request = json_body(payload).map_err(OtpError::Validation)?;
    validate_email(&request.email).map_err(OtpError::Validation)?;
    validate_otp_code(&request.code).map_err(OtpError::Validation)?;

    let verification = state.otp.verify_otp(&request.email, &request.code).await?;
    Ok(DataResponse::new(verification))
}

pub async fn create_user<U: UserStore, S: TokenStore, N: Notifier>(
    State(state): State<AppState<U, S, N>>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> AuthResult<impl IntoResponse> {
    let new_user = json_body(payload).map_err(AuthError::Validation)?;
    validate_new_user(&new_user)?;

    let user = state
        .auth
        .register(&new_user.email, &new_user.password)
        .await?;
    Ok((StatusCode::CREATED, DataResponse::new(user)))
}

pub async fn list_users<U: UserStore, S: TokenStore, N: Notifier>(
    State(state): State<AppState<U, S, N>>,
) -> AuthResult<impl IntoResponse> {
    Ok(DataResponse::new(state.auth.list_users().await?))
}

pub async fn find_user<U: UserStore, S: TokenStore, N: Notifier>(
    State(state): State<AppState<U, S, N>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AuthResult<impl IntoResponse> {
    let user = state.auth.find_user(path_id(id)?).await?;
    Ok(DataResponse::new(user))
}

pub async fn update_user<U: UserStore, S: TokenStore, N: Notifier>(
    State(state): State<AppState<U, S, N>>,
    Extension(caller): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUser>, JsonRejection>,
) -> AuthResult<impl IntoResponse> {
    let id = path_id(id)?;
    let update = json_body(payload).map_err(AuthError::Validation)?;
    if let Some(email) = &update.email {
        validate_email(email).map_err(AuthError::Validation)?;
    }

    let user = state.auth.update_user(caller.id, id, &update).await?;
    Ok(DataResponse::new(user))
}

pub async fn remove_user<U: UserStore, S: TokenStore, N: Notifier>(
    State(state): State<AppState<U, S, N>>,
    Extension(caller): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AuthResult<impl IntoResponse> {
    state.auth.remove_user(caller.id, path_id(id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
