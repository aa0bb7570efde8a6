//! HTTP server implementation using Axum.

use crate::handlers::{handle_health, handle_rpc};
use axum::{
    routing::{get, post},
    Router,
};
use prompt_relay::PromptService;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    /// Prompt operations fronted by the shared caches
    pub service: PromptService,
}

/// Build the router for the given state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Start the JSON-RPC HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    service: PromptService,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let app = router(Arc::new(AppState { service }));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompt_relay::{CacheRegistry, ClientConfig, PromptClient};

    #[tokio::test]
    async fn test_server_starts() {
        let client = PromptClient::new(
            ClientConfig::new("pk-lf-test", "sk-lf-test").with_base_url("http://127.0.0.1:9"),
        )
        .unwrap();
        let service = PromptService::new(Arc::new(client), Arc::new(CacheRegistry::new())).unwrap();

        let addr = start_server(service, "127.0.0.1", 0).await.unwrap();
        assert!(addr.port() > 0);
    }

    #[tokio::test]
    async fn test_invalid_host_is_rejected() {
        let client = PromptClient::new(ClientConfig::new("pk", "sk")).unwrap();
        let service = PromptService::new(Arc::new(client), Arc::new(CacheRegistry::new())).unwrap();

        assert!(start_server(service, "not a host", 0).await.is_err());
    }
}
