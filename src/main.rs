use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use gradebook_gate::gateway::{GatewayConfig, gateway_routes};
use gradebook_gate::{HandlebarsRenderer, JsonGradebook};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Missing provider credentials are fatal here, never at request time.
    let config = GatewayConfig::from_env().context("loading gateway configuration")?;

    let data_file =
        std::env::var("GRADES_DATA_FILE").unwrap_or_else(|_| "grades_data.json".to_string());
    let gradebook = JsonGradebook::load(&data_file);

    let renderer = HandlebarsRenderer::new().context("compiling page templates")?;

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8000".to_string())
        .parse()
        .context("BIND_ADDR must be host:port")?;

    let app = gateway_routes(config, gradebook, renderer);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, data_file = %data_file, "Gradebook gateway listening");

    axum::serve(listener, app).await?;
    Ok(())
}
