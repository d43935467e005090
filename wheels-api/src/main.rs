use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wheels_api::{app, AppState, AuthConfig};
use wheels_store::app_config::{Config, StorageBackend};
use wheels_store::{DbClient, PgBookingRepository, PgTripRepository, PgUserRepository, RedisClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wheels_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Wheels API on port {}", config.server.port);

    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
        expiration: config.auth.jwt_expiration_seconds,
    };

    let state = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            AppState::in_memory(auth, config.business_rules.clone())
        }
        StorageBackend::Postgres => {
            let db = DbClient::connect(&config.database)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;

            AppState::new(
                Arc::new(PgTripRepository::new(db.pool.clone())),
                Arc::new(PgBookingRepository::new(db.pool.clone())),
                Arc::new(PgUserRepository::new(db.pool.clone())),
                auth,
                config.business_rules.clone(),
            )
        }
    };

    let state = match &config.redis.url {
        Some(url) => {
            let redis = RedisClient::new(url).context("Invalid Redis url")?;
            tracing::info!("Rate limiting {} requests per {}s", config.rate_limit.requests, config.rate_limit.window_seconds);
            state.with_rate_limit(Arc::new(redis), config.rate_limit.clone())
        }
        None => state,
    };

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
