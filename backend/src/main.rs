//! GanttFlow - Backend Server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use ganttflow_backend::{
    config::StoreKind,
    create_app,
    store::{MemoryStore, PgStore},
    AppState, Config,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ganttflow_server=debug,ganttflow_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting GanttFlow Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!(
        "Unlock offset: {} days",
        config.schedule.unlock_offset_days
    );

    let state = match config.store.kind {
        StoreKind::Postgres => {
            // Create database connection pool
            tracing::info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(&config.database.url)
                .await?;

            tracing::info!("Database connection established");

            if config.database.run_migrations {
                tracing::info!("Running database migrations...");
                sqlx::migrate!("./migrations").run(&db_pool).await?;
                tracing::info!("Migrations completed");
            }

            let store = Arc::new(PgStore::new(db_pool, config.events.channel_capacity));
            store.spawn_listener().await?;
            AppState::start(store, config.clone()).await?
        }
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            let store = Arc::new(MemoryStore::new(config.events.channel_capacity));
            AppState::start(store, config.clone()).await?
        }
    };

    tracing::info!("Loaded {} references", state.live.snapshot().await.len());

    // Build application
    let app = create_app(state);

    // Start server
    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
