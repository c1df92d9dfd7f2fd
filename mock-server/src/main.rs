use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("recipe_mock_server=info,mock_server=info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    init_tracing();
    let port = std::env::var("PORT").unwrap_or_else(|_| "8000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let options = mock_server::Options::from_lookup(|key| std::env::var(key).ok()).map_err(|err| {
        tracing::error!(error = %err, "refusing to start");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
    })?;
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, seed = options.seed, latency_ms = options.latency.as_millis() as u64, "listening");
    mock_server::run_with(listener, options).await
}
