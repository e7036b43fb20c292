//! Middleware for access token validation

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use pomo_common::{
    TokenStore,
    web::{AuthRejection, authenticate},
};

use crate::{notifier::Notifier, repositories::UserStore, state::AppState};

/// Verify the access token and attach the caller's [`pomo_common::AuthUser`]
/// to the request extensions
pub async fn require_auth<U, S, N>(
    State(state): State<AppState<U, S, N>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthRejection>
where
    U: UserStore,
    S: TokenStore,
    N: Notifier,
{
    let user = authenticate(req.headers(), state.auth.jwt())?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
