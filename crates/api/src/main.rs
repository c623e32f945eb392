//! RecipeMaster API server

use recipemaster_api::{config::LogFormat, Config, RelayServer, ServerError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    run().await?;
    Ok(())
}

async fn run() -> Result<(), ServerError> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!(
        bind_address = %config.bind_address,
        heartbeat_interval_ms = config.heartbeat_interval.as_millis() as u64,
        "Starting RecipeMaster API"
    );

    let server = RelayServer::bind(&config).await?;
    server.serve_with_shutdown(shutdown_signal()).await
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
