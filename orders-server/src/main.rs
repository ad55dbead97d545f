use orders_server::{Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. .env, configuration and logging
    let config = setup_environment()?;

    print_banner();
    tracing::info!("🦀 Orders server starting...");

    // 2. Storage backend and shared state
    let state = ServerState::initialize(&config)?;

    // 3. HTTP server, until Ctrl-C
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
