use accounts::{AccountError, CredentialStore};
use fileserver::{ConfigError, FileServerApi, ServerConfig, ServerState};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("credential store error: {0}")]
    Accounts(#[from] AccountError),
    #[error("server error: {0}")]
    Server(Box<dyn std::error::Error + Send + Sync>),
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let config = ServerConfig::from_env()?;
    let files_root = config.canonical_files_root()?;

    let accounts = CredentialStore::open(&config.database_url).await?;
    tracing::info!(
        "Credential store ready ({} users)",
        accounts.user_count().await?
    );

    let state = ServerState::new(files_root.clone(), accounts, config.token_ttl)
        .bind_client_ip(config.bind_client_ip);

    tracing::info!(
        "Serving {} (token TTL {}s, client binding {})",
        files_root.display(),
        config.token_ttl.as_secs(),
        if config.bind_client_ip { "on" } else { "off" }
    );

    FileServerApi::new(state)
        .serve(&config.host, config.port, config.sweep_interval, shutdown_signal())
        .await
        .map_err(AppError::Server)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
