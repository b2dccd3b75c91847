//! wallet-advisor HTTP Server
//!
//! Axum-based read surface over the portfolio monitor: watch an address,
//! then poll its latest snapshot, risk metrics and recommendations.

mod handlers;
mod state;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_advisor::{AdvisorConfig, PortfolioMonitor};

use crate::handlers::{
    get_portfolio, get_preferences, health_check, refresh_portfolio, reset_preferences,
    unwatch_address, update_preferences, watch_address,
};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AdvisorConfig::from_env()?;
    if config.use_mock_sources {
        tracing::warn!("⚠ Using demo sources - balances and prices are not live");
    } else {
        tracing::info!("✓ Ledger RPC: {}", config.rpc_url);
        tracing::info!("✓ Price API:  {}", config.price_api_url);
    }

    let monitor = PortfolioMonitor::from_config(&config);
    let state = AppState::new(monitor, config.use_mock_sources);
    let app = router(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("wallet-advisor server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Refresh interval: {}s", config.refresh_interval.as_secs());
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health                          - Health check");
    tracing::info!("  POST   /api/watch                       - Start watching an address");
    tracing::info!("  DELETE /api/watch/{{address}}             - Stop watching");
    tracing::info!("  GET    /api/portfolio/{{address}}         - Latest view");
    tracing::info!("  POST   /api/portfolio/{{address}}/refresh - Refresh now");
    tracing::info!("  GET|PUT|DELETE /api/preferences         - Investment preferences");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Watching
        .route("/api/watch", post(watch_address))
        .route("/api/watch/{address}", delete(unwatch_address))
        // Read surface
        .route("/api/portfolio/{address}", get(get_portfolio))
        .route("/api/portfolio/{address}/refresh", post(refresh_portfolio))
        // Preferences
        .route(
            "/api/preferences",
            get(get_preferences)
                .put(update_preferences)
                .delete(reset_preferences),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use wallet_advisor::source::DEMO_ADDRESS;

    fn test_app() -> Router {
        let config = AdvisorConfig {
            use_mock_sources: true,
            ..AdvisorConfig::default()
        };
        router(AppState::new(PortfolioMonitor::from_config(&config), true))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["mock_sources"], true);
    }

    #[tokio::test]
    async fn test_unwatched_portfolio_is_not_found() {
        let response = test_app()
            .oneshot(
                Request::get(format!("/api/portfolio/{DEMO_ADDRESS}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "NOT_WATCHED");
    }

    #[tokio::test]
    async fn test_watch_then_read() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/watch",
                &format!(r#"{{"address":"{DEMO_ADDRESS}"}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/api/portfolio/{DEMO_ADDRESS}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["address"], DEMO_ADDRESS);

        let response = app
            .oneshot(
                Request::delete(format!("/api/watch/{DEMO_ADDRESS}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_rewatch_replaces_existing_watch() {
        let app = test_app();
        let body = format!(r#"{{"address":"{DEMO_ADDRESS}"}}"#);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(json_request("POST", "/api/watch", &body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::ACCEPTED);
        }

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["watched_addresses"], 1);
    }

    #[tokio::test]
    async fn test_watch_invalid_address() {
        let response = test_app()
            .oneshot(json_request("POST", "/api/watch", r#"{"address":"nope"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "INVALID_ADDRESS");
    }

    #[tokio::test]
    async fn test_preferences_update_validation() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/preferences",
                r#"{"risk_tolerance":"conservative"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["preferences"]["risk_tolerance"], "conservative");
        assert_eq!(body["is_configured"], true);

        let response = app
            .oneshot(json_request(
                "PUT",
                "/api/preferences",
                r#"{"rebalance_threshold":"250"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
