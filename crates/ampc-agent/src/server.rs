//! Agent API server implementation

use crate::Result;
use ampc_core::config::AgentServerConfig;
use ampc_core::constants::API_VERSION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// JSON error envelope with the status mirrored in the body
fn json_error(code: StatusCode, message: &str) -> Response {
    (
        code,
        Json(json!({"error": message, "http_code": code.as_u16()})),
    )
        .into_response()
}

async fn version_discovery() -> Response {
    Json(json!({"api_version": API_VERSION})).into_response()
}

async fn response_test() -> Response {
    Json(json!({"info": "Hello world!"})).into_response()
}

async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "Not Found")
}

/// The agent's router
pub fn create_router() -> Router {
    Router::new()
        .route("/", get(version_discovery))
        .route("/test", get(response_test))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
}

/// Plain-HTTP agent server
pub struct AgentServer {
    config: AgentServerConfig,
}

impl AgentServer {
    pub fn new(config: &AgentServerConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Bind and serve until the process exits
    pub async fn serve(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.bind_host, self.config.bind_port);
        let listener = TcpListener::bind(&addr).await?;
        info!("Amphora agent API listening on http://{}", addr);
        axum::serve(listener, create_router()).await?;
        Ok(())
    }
}
