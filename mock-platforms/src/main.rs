use mock_platforms::{MockConfig, MockPlatforms};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let _g = rt.enter();
    rt.block_on(run_server())
}

async fn run_server() -> anyhow::Result<()> {
    let addr = std::env::var("MOCK_PLATFORMS_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("mock platforms listening on {}", listener.local_addr()?);
    let mut config = MockConfig::default();
    if let Ok(limit) = std::env::var("MOCK_PLATFORMS_LOG_LIMIT") {
        config.log_limit = limit.parse()?;
    }
    let router = mock_platforms::router(MockPlatforms::new(config));
    axum::serve(listener, router).await?;
    Ok(())
}
