//! HTTP API
//!
//! `GET /wallet?address=...` always answers 200; failures are reported in
//! the body as `{"error": "..."}`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::Method,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::error::{Error, Result};
use crate::wallet::{ClassificationResult, WalletClassifier};

/// Query string of `GET /wallet`
#[derive(Debug, Deserialize)]
pub struct WalletQuery {
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub fn create_router(classifier: Arc<WalletClassifier>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/wallet", get(classify_wallet))
        .route("/health", get(health))
        .with_state(classifier)
        .layer(cors)
}

/// Bind and serve until the process is stopped
pub async fn serve(bind_addr: SocketAddr, classifier: Arc<WalletClassifier>) -> Result<()> {
    let app = create_router(classifier);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Internal(format!("HTTP server error: {}", e)))?;

    Ok(())
}

async fn classify_wallet(
    State(classifier): State<Arc<WalletClassifier>>,
    Query(query): Query<WalletQuery>,
) -> Json<ClassificationResult> {
    // A missing address is just another invalid address
    let address = query.address.unwrap_or_default();
    Json(classifier.classify(&address).await)
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::stub::StubProvider;
    use crate::provider::OwnedTokenBalance;
    use crate::registry::{FixedThreshold, RegistryLoader, ThresholdRegistry};
    use crate::wallet::BalanceFetcher;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(provider: Arc<StubProvider>) -> Router {
        let mut registry = ThresholdRegistry::new();
        registry.load("0x1,FOO,Foo,50,eth-mainnet\n", &mut FixedThreshold(0.0));
        let classifier = WalletClassifier::new(
            Arc::new(RegistryLoader::preloaded(registry)),
            provider,
            BalanceFetcher::new(),
        );
        create_router(Arc::new(classifier))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("failed to build request");
        let response = app.oneshot(request).await.expect("router request failed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        (status, serde_json::from_slice(&bytes).expect("response is not json"))
    }

    #[tokio::test]
    async fn test_classify_wallet() {
        let provider = Arc::new(StubProvider::with_balances(vec![OwnedTokenBalance::new(
            "FOO", "75",
        )]));
        let (status, body) = get_json(
            app(provider),
            "/wallet?address=0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["FOO"]["classification"], "GodMode");
        assert_eq!(body["FOO"]["threshold"].as_f64(), Some(50.0));
        assert_eq!(body["FOO"]["balance"].as_f64(), Some(75.0));
    }

    #[tokio::test]
    async fn test_invalid_address_is_200() {
        let provider = Arc::new(StubProvider::with_balances(Vec::new()));
        let (status, body) =
            get_json(app(Arc::clone(&provider)), "/wallet?address=not-an-address").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"error": "Invalid wallet address"}));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_address() {
        let provider = Arc::new(StubProvider::with_balances(Vec::new()));
        let (status, body) = get_json(app(provider), "/wallet").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"error": "Invalid wallet address"}));
    }

    #[tokio::test]
    async fn test_health() {
        let provider = Arc::new(StubProvider::with_balances(Vec::new()));
        let (status, body) = get_json(app(provider), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
