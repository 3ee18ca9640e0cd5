use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let id = std::env::var("EDGE_CONFIG_ID").unwrap_or_else(|_| "ecfg-1".to_string());
    let token = std::env::var("EDGE_CONFIG_TOKEN").unwrap_or_else(|_| "token-1".to_string());
    let items: Map<String, Value> = match std::env::var("EDGE_CONFIG_ITEMS") {
        Ok(raw) => serde_json::from_str(&raw).map_err(std::io::Error::other)?,
        Err(_) => Map::new(),
    };

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    let store = mock_server::Store::new(id, token, items);
    tracing::info!(%addr, id = store.id(), "listening");
    mock_server::run(listener, store).await
}
