use std::sync::Arc;
use std::time::Duration;

use media_identity::{
    auth_routes,
    session::{
        sweep::{start_expiry_sweep, SweepConfig},
        BroadcastEventPublisher,
    },
    AppState, AuthConfig, BcryptPasswordHasher, InMemoryRefreshTokenRepository,
    InMemoryUserRepository, PostgresRefreshTokenRepository, PostgresUserRepository,
    RefreshTokenRepository, SessionService, UserRepository,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "media_identity=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting identity service");

    let config = AuthConfig::from_env()?;
    info!(?config, "Loaded auth configuration");

    let users: Arc<dyn UserRepository>;
    let refresh_tokens: Arc<dyn RefreshTokenRepository>;
    match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(5))
                .connect(&database_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Connected to PostgreSQL");

            users = Arc::new(PostgresUserRepository::new(pool.clone()));
            refresh_tokens = Arc::new(PostgresRefreshTokenRepository::new(pool));
        }
        Err(_) => {
            warn!("DATABASE_URL not set, using in-memory stores");
            users = Arc::new(InMemoryUserRepository::new());
            refresh_tokens = Arc::new(InMemoryRefreshTokenRepository::new());
        }
    }

    let events = Arc::new(BroadcastEventPublisher::new(1000));
    let session_service = Arc::new(
        SessionService::new(
            &config,
            users,
            refresh_tokens,
            Arc::new(BcryptPasswordHasher::new(config.bcrypt_cost)),
        )
        .with_event_publisher(events),
    );

    let sweep_config = std::env::var("TOKEN_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(|secs| SweepConfig {
            sweep_interval: Duration::from_secs(secs),
        })
        .unwrap_or_default();
    tokio::spawn(start_expiry_sweep(session_service.clone(), sweep_config));

    let app = auth_routes(AppState::new(session_service)).layer(TraceLayer::new_for_http());

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(address = %bind_addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
