// School Administration Server

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use school_admin::{app_state::AppState, config::Config, school_interface::create_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    let app = create_app(app_state);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    info!("School admin server starting on http://{}", addr);
    info!("  POST/GET          /api/v1/students          - Enroll / list students");
    info!("  GET/PUT/DELETE    /api/v1/students/{{id}}     - Student record");
    info!("  POST/GET          /api/v1/teachers          - Hire / list teachers");
    info!("  GET/PUT/DELETE    /api/v1/teachers/{{id}}     - Teacher record");
    info!("  POST/GET          /api/v1/classes           - Create / list classes");
    info!("  GET/PUT/DELETE    /api/v1/classes/{{id}}      - Class record");
    info!("  GET               /api/v1/sequences/{{key}}   - Inspect an id counter");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
