use anyhow::Context;

use relo_infra::{AppConfig, LogFormat};
use relo_observability::Format;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    relo_observability::init_with(match config.log_format {
        LogFormat::Json => Format::Json,
        LogFormat::Text => Format::Text,
    });

    if config.database_url.is_none() {
        tracing::warn!("DATABASE_URL not set; using in-memory stores");
    }

    let services = relo_api::app::services::build_services(&config).await?;
    let app = relo_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        stock_writes = config.stock_write_mode.as_str(),
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
