use mock_server::ServerConfig;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,mock_server=debug,tower_http=debug")),
        )
        .init();

    let config = ServerConfig::from_env();
    let listener = TcpListener::bind(config.socket_addr()).await?;
    mock_server::run(listener).await
}
