//! API service routes

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use pomo_common::{AuthUser, DataResponse, web::envelope_path};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::require_auth,
    models::{CreatePomodoro, PomodoroQuery, StartPomodoro, UpdatePomodoro},
    repositories::PomodoroStore,
    state::AppState,
};

/// Create the router for the API service
pub fn create_router<P: PomodoroStore>(state: AppState<P>) -> Router {
    let protected = Router::new()
        .route(
            "/pomodoros",
            get(list_pomodoros::<P>).post(create_pomodoro::<P>),
        )
        .route("/pomodoros/stats", get(pomodoro_stats::<P>))
        .route("/pomodoros/active", get(active_pomodoro::<P>))
        .route(
            "/pomodoros/:id",
            get(get_pomodoro::<P>)
                .put(update_pomodoro::<P>)
                .delete(delete_pomodoro::<P>),
        )
        .route("/pomodoros/:id/start", post(start_pomodoro::<P>))
        .route("/pomodoros/:id/pause", post(pause_pomodoro::<P>))
        .route("/pomodoros/:id/resume", post(resume_pomodoro::<P>))
        .route("/pomodoros/:id/complete", post(complete_pomodoro::<P>))
        .route("/pomodoros/:id/cancel", post(cancel_pomodoro::<P>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth::<P>,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .layer(middleware::from_fn(envelope_path))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "api-service"
    }))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn path_id(id: Result<Path<Uuid>, PathRejection>) -> ApiResult<Uuid> {
    id.map(|Path(id)| id)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

pub async fn create_pomodoro<P: PomodoroStore>(
    State(state): State<AppState<P>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreatePomodoro>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let input = json_body(payload)?;
    let pomodoro = state.pomodoros.create(user.id, input).await?;
    Ok((
        StatusCode::CREATED,
        DataResponse::new(pomodoro.view(Utc::now())),
    ))
}

pub async fn list_pomodoros<P: PomodoroStore>(
    State(state): State<AppState<P>>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<PomodoroQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let page = state.pomodoros.find_all(user.id, query).await?;
    Ok(DataResponse::new(page))
}

pub async fn pomodoro_stats<P: PomodoroStore>(
    State(state): State<AppState<P>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let stats = state.pomodoros.get_stats(user.id).await?;
    Ok(DataResponse::new(stats))
}

/// The caller's running session, or `null`
pub async fn active_pomodoro<P: PomodoroStore>(
    State(state): State<AppState<P>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let active = state.pomodoros.get_current_active(user.id).await?;
    let now = Utc::now();
    Ok(DataResponse::new(active.map(|p| p.view(now))))
}

pub async fn get_pomodoro<P: PomodoroStore>(
    State(state): State<AppState<P>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let pomodoro = state.pomodoros.find_one(path_id(id)?, user.id).await?;
    Ok(DataResponse::new(pomodoro.view(Utc::now())))
}

pub async fn update_pomodoro<P: PomodoroStore>(
    State(state): State<AppState<P>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdatePomodoro>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = path_id(id)?;
    let update = json_body(payload)?;
    let pomodoro = state.pomodoros.update(id, user.id, update).await?;
    Ok(DataResponse::new(pomodoro.view(Utc::now())))
}

pub async fn delete_pomodoro<P: PomodoroStore>(
    State(state): State<AppState<P>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    state.pomodoros.delete(path_id(id)?, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start a session; the body is optional and may carry an explicit `startTime`
pub async fn start_pomodoro<P: PomodoroStore>(
    State(state): State<AppState<P>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let id = path_id(id)?;
    let input = if body.is_empty() {
        StartPomodoro::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    let pomodoro = state.pomodoros.start(id, user.id, input).await?;
    Ok(DataResponse::new(pomodoro.view(Utc::now())))
}

pub async fn pause_pomodoro<P: PomodoroStore>(
    State(state): State<AppState<P>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let pomodoro = state.pomodoros.pause(path_id(id)?, user.id).await?;
    Ok(DataResponse::new(pomodoro.view(Utc::now())))
}

pub async fn resume_pomodoro<P: PomodoroStore>(
    State(state): State<AppState<P>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let pomodoro = state.pomodoros.resume(path_id(id)?, user.id).await?;
    Ok(DataResponse::new(pomodoro.view(Utc::now())))
}

pub async fn complete_pomodoro<P: PomodoroStore>(
    State(state): State<AppState<P>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let pomodoro = state.pomodoros.complete(path_id(id)?, user.id).await?;
    Ok(DataResponse::new(pomodoro.view(Utc::now())))
}

pub async fn cancel_pomodoro<P: PomodoroStore>(
    State(state): State<AppState<P>>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let pomodoro = state.pomodoros.cancel(path_id(id)?, user.id).await?;
    Ok(DataResponse::new(pomodoro.view(Utc::now())))
}
