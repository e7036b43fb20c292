use anyhow::Result;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pomo_auth::{
    AppState, AuthService,
    cookies::CookieConfig,
    notifier::{EmailConfig, EmailNotifier},
    otp::{OtpConfig, OtpService},
    password::{PasswordConfig, PasswordService},
    repositories::UserRepository,
    routes,
};
use pomo_common::{
    JwtConfig, JwtService, RedisConfig, RedisPool, database,
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

    info!("Starting authentication service");

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

    // Initialize Redis connection
    let redis_pool = RedisPool::connect(&RedisConfig::from_env()).await?;
    if !redis_pool.health_check().await? {
        anyhow::bail!("Failed to connect to Redis");
    }

    let jwt_service = JwtService::new(JwtConfig::from_env());
    let passwords = PasswordService::new(&PasswordConfig::from_env())?;
    let notifier = EmailNotifier::from_config(EmailConfig::from_env())?;

    let auth = AuthService::new(
        UserRepository::new(pool.clone()),
        redis_pool.clone(),
        jwt_service,
        passwords,
    );
    let otp = OtpService::new(redis_pool, notifier, OtpConfig::from_env());
    let app_state = AppState::new(auth, otp, CookieConfig::from_env());

    let server_config = ServerConfig::from_env("AUTH_PORT", 3000);
    let app = routes::create_router(app_state)
        .layer(build_cors_layer(&server_config))
        .layer(TraceLayer::new_for_http());

    let address = server_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Authentication service listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("Authentication service stopped");
    Ok(())
}
