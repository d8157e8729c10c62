//! Booking API server.
//!
//! Run from repo root: `cargo run -p booking-server`
//! Configuration comes from the environment or a `.env` file (see `AppConfig`).

use booking_api::{build_router, ensure_database_exists, ensure_schema, AppConfig, AppState, PgStore, Tables};
use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("booking_api=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    ensure_database_exists(&config.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    let tables = Tables::new(&config.schema);
    ensure_schema(&pool, &tables).await?;
    let state = AppState::new(PgStore::new(pool, tables));

    let app = build_router(state, config.body_limit);
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
