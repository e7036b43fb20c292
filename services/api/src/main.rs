use anyhow::Result;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pomo_api::{AppState, PomodoroService, repositories::PomodoroRepository, routes};
use pomo_common::{
    JwtConfig, JwtService, database,
    web::{ServerConfig, build_cors_layer, shutdown_signal},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting API service");

    // Initialize database connection pool
    let db_config = database::DatabaseConfig::from_env();
    let pool = database::init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }
    database::run_migrations(&pool).await?;

    let pomodoros = PomodoroService::new(PomodoroRepository::new(pool.clone()));
    let app_state = AppState::new(pomodoros, JwtService::new(JwtConfig::from_env()));

    let server_config = ServerConfig::from_env("API_PORT", 3001);
    let app = routes::create_router(app_state)
        .layer(build_cors_layer(&server_config))
        .layer(TraceLayer::new_for_http());

    let address = server_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("API service stopped");
    Ok(())
}
