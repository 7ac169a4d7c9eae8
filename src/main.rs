use std::net::SocketAddr;

use ado_relay::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let state = ado_relay::build_state(config).await?;
    let app = ado_relay::app(state);

    tracing::info!("listening on {addr}");
    axum::Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
