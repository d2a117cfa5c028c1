use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use garagebook::config::AppConfig;
use garagebook::db;
use garagebook::db::store::SqliteStore;
use garagebook::handlers;
use garagebook::lifecycle::BookingLifecycleService;
use garagebook::notifications::SqliteNotificationSink;
use garagebook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    anyhow::ensure!(!config.api_token.is_empty(), "API_TOKEN must not be empty");
    if config.api_token == "changeme" {
        tracing::warn!("API_TOKEN is the default value; set it before exposing this service");
    }

    let conn = Arc::new(Mutex::new(db::init_db(&config.database_url)?));
    let store = Arc::new(SqliteStore::from_shared(Arc::clone(&conn)));
    let lifecycle = BookingLifecycleService::new(store.clone(), store.clone(), store);

    let (notification_tx, _) = broadcast::channel(config.notification_channel_capacity);
    let sink = SqliteNotificationSink::new(Arc::clone(&conn), notification_tx.clone());

    let state = Arc::new(AppState {
        db: conn,
        config: config.clone(),
        lifecycle,
        notifications: Box::new(sink),
        notification_tx,
    });

    let app = handlers::router(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
