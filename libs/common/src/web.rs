//! HTTP plumbing shared by the services
//!
//! Response envelopes and the middleware that stamps them with the request
//! path, authenticated-identity extraction, listener configuration and CORS.

use std::time::Duration;

use axum::{
    Json,
    extract::Request,
    http::{
        HeaderMap, HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::jwt::{JwtService, TokenError, TokenType};

/// Cookie carrying the access token
pub const ACCESS_COOKIE: &str = "access_token";
/// Cookie carrying the refresh token
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Standard success envelope: `{ "success": true, "data": ..., "timestamp": ..., "path": ... }`
///
/// `path` is filled in by [`envelope_path`] once the response leaves the router.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub timestamp: DateTime<Utc>,
    pub path: String,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now(),
            path: String::new(),
        }
    }
}

impl<T: Serialize> IntoResponse for DataResponse<T> {
    fn into_response(self) -> Response {
        envelope(StatusCode::OK, &self)
    }
}

/// Standard error envelope
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub status_code: u16,
    pub code: &'static str,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub path: String,
}

/// Build an error response in the standard envelope
pub fn error_response(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    let body = ErrorResponse {
        success: false,
        status_code: status.as_u16(),
        code,
        message: message.into(),
        timestamp: Utc::now(),
        path: String::new(),
    };
    envelope(status, &body)
}

/// Serialized envelope carried on the response until its path is known
#[derive(Debug, Clone)]
struct PendingEnvelope(Value);

fn envelope(status: StatusCode, body: &impl Serialize) -> Response {
    match serde_json::to_value(body) {
        Ok(value) => {
            let mut response = (status, Json(&value)).into_response();
            response.extensions_mut().insert(PendingEnvelope(value));
            response
        }
        Err(e) => {
            error!("Failed to serialize response envelope: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Stamp envelope responses with the request's path and query
///
/// Status and headers, cookies included, pass through untouched. Responses
/// that are not envelopes are returned as-is.
pub async fn envelope_path(request: Request, next: Next) -> Response {
    let uri = request.uri();
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let mut response = next.run(request).await;
    let Some(PendingEnvelope(mut value)) = response.extensions_mut().remove::<PendingEnvelope>()
    else {
        return response;
    };
    value["path"] = Value::String(path);

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Json(value).into_response().into_body())
}

/// Identity of the caller, produced by verifying an access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Why a request could not be authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    MissingToken,
    InvalidToken(TokenError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            AuthRejection::MissingToken => "Missing access token",
            AuthRejection::InvalidToken(_) => "Invalid or expired token",
        };
        error_response(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }
}

/// Access token from the `access_token` cookie, else from `Authorization: Bearer`
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Verify the request's access token and return the caller's identity
pub fn authenticate(headers: &HeaderMap, jwt: &JwtService) -> Result<AuthUser, AuthRejection> {
    let token = access_token(headers).ok_or(AuthRejection::MissingToken)?;
    let claims = jwt
        .validate_typed(&token, TokenType::Access)
        .map_err(|e| {
            warn!("Rejected access token: {}", e);
            AuthRejection::InvalidToken(e)
        })?;

    Ok(AuthUser {
        id: claims.sub,
        email: claims.email,
    })
}

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`)
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Allowed CORS origins, from the comma-separated `CORS_ORIGINS`
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Create a new ServerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `HOST`: Bind address (default: `0.0.0.0`)
    /// - `port_var`: Bind port (default: `default_port`)
    /// - `CORS_ORIGINS`: Allowed origins (default: `http://localhost:3000`)
    pub fn from_env(port_var: &str, default_port: u16) -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var(port_var)
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(default_port);
        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port,
            cors_origins,
        }
    }

    /// `host:port` to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// CORS layer allowing credentialed requests from the configured origins
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Resolves when the process receives Ctrl+C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
