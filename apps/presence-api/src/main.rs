use std::net::SocketAddr;
use std::path::Path;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use presence_api::config::Config;
use presence_api::directory::Fixtures;
use presence_api::AppState;

#[tokio::main]
async fn main() {
    // Load .env file; env vars may also be set externally.
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let fixtures = match &config.directory_path {
        Some(path) => match Fixtures::load(path) {
            Ok(fixtures) => fixtures,
            Err(e) => {
                tracing::error!(error = %e, "failed to load user directory");
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("DIRECTORY_PATH not set; starting with an empty user directory");
            Fixtures::default()
        }
    };

    let state = match AppState::from_fixtures(config, fixtures).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize presence state");
            std::process::exit(1);
        }
    };

    tracing::info!(
        users = state.directory.len(),
        queue_capacity = state.config.queue_capacity,
        "presence-api configured"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(presence_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "presence-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    state.teardown();
    tracing::info!("presence-api stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(?e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
