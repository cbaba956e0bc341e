use clap::Parser;
use spotmatch_gateway::config::Cli;
use spotmatch_gateway::{AppState, create_router, telemetry};
use spotmatch_types::constants::{ENGINE_NAME, VERSION};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    telemetry::init(&config.server);

    tracing::info!(
        engine = ENGINE_NAME,
        version = VERSION,
        markets = config.markets.len(),
        "starting node"
    );

    let state = AppState::in_memory(&config).await?;
    let app = create_router(state);

    let listener = TcpListener::bind(config.server.listen_addr).await?;
    tracing::info!(addr = %config.server.listen_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
