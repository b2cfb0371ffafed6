use scansheet::api::{create_router, AppState};
use scansheet::infrastructure::AppConfig;
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=debug,scansheet=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    if config.config.llm.api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; extraction requests will fail");
    }
    info!(
        model = %config.config.llm.model,
        chunk_size = config.config.batch.chunk_size,
        sheets = ?config.config.sheets.backend,
        "configuration loaded"
    );

    let addr = SocketAddr::new(
        config.config.server.host.parse()?,
        config.config.server.port,
    );
    let state = AppState::from_config(config)?;
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
