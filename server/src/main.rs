use server::{AppState, ServerConfig, routes};

#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] server::config::ConfigError),
    #[error("session key: {0}")]
    Session(#[from] session::SessionError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env()?;
    let sessions = session::SessionKey::from_env()?;
    let port = config.port;

    tracing::info!(
        grid_width = config.grid_width,
        grid_height = config.grid_height,
        cooldown = ?config.cooldown,
        origins = ?config.allowed_origins,
        "canvas configured"
    );

    let app = routes::app(AppState::new(config, sessions));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, "pixel-server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
