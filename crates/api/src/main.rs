use std::sync::Arc;

use anyhow::Context;

use bytebasket_api::{build_app, AppConfig, AppServices};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("invalid configuration")?;
    bytebasket_observability::init(config.log_format);

    if config.uses_default_secret() {
        tracing::warn!("JWT_SECRET not set; using insecure development default");
    }
    tracing::info!(config = ?config, "starting bytebasket api");

    let bind_addr = config.bind_addr;
    let services = AppServices::from_config(config).await?;
    services
        .bootstrap_admin()
        .await
        .context("bootstrap admin failed")?;

    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
