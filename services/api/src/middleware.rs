//! Middleware for access token validation

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use pomo_common::web::{AuthRejection, authenticate};

use crate::{repositories::PomodoroStore, state::AppState};

/// Verify the access token and attach the caller's [`pomo_common::AuthUser`]
/// to the request extensions
pub async fn require_auth<P: PomodoroStore>(
    State(state): State<AppState<P>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthRejection> {
    let user = authenticate(req.headers(), &state.jwt)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
