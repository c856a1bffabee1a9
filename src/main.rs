use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use charla::api::{self, AppState};
use charla::config::AppConfig;
use charla::inference::LlamaSession;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // -----------------------------
    // Logging
    // -----------------------------
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("charla=info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("🚀 Starting charla chat server...");

    // -----------------------------
    // Shared state / Dependencies
    // -----------------------------
    let config = AppConfig::from_env()?;
    let session = LlamaSession::load(&config.model)?;
    let state = AppState {
        engine: Arc::new(session),
    };

    // -----------------------------
    // Router
    // -----------------------------
    let app = api::router()
        // CORS for frontend
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state);

    println!("🌐 HTTP listening on http://{}", config.bind);

    let listener = TcpListener::bind(config.bind).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
