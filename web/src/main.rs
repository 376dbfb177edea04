//! Memory Scramble web server
//!
//! Minimal HTTP server exposing the shared board to concurrent players.
//! Endpoints:
//! - GET /health                    - Health check
//! - GET /look/:player              - Render the board for a player
//! - GET /flip/:player/:row/:column - Drive the player's turn one flip forward
//! - GET /watch/:player             - Block until the board changes, then render
//! - GET /map/:player?from=A&to=B   - Rewrite card labels, preserving pairs
//!
//! Board operations respond with the plain-text board rendering; failures
//! map to 400 (bad coordinates) or 409 (contended or missing cards).

use anyhow::Context;
use axum::{routing::get, Router};
use scramble_core::Board;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

mod central_config;
mod handlers;
mod types;

use handlers::{flip, health, look, map_labels, watch};

/// Shared application state
pub struct AppState {
    /// The shared game board; owns its own locking, so handlers never
    /// serialize behind an outer mutex.
    pub board: Arc<Board>,
}

/// Create the application router with the given state.
/// This is separated out for testing purposes.
pub fn create_app(state: Arc<AppState>) -> Router {
    // CORS layer for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/look/:player", get(look))
        .route("/flip/:player/:row/:column", get(flip))
        .route("/watch/:player", get(watch))
        .route("/map/:player", get(map_labels))
        .layer(cors)
        .with_state(state)
}

/// Create application state for testing (small fixed board, no logging)
#[cfg(test)]
pub fn create_test_state() -> Arc<AppState> {
    let labels = ["A", "A", "B", "B"].iter().map(|s| s.to_string()).collect();
    let board = Board::new(2, 2, labels).expect("test board is valid");
    Arc::new(AppState {
        board: Arc::new(board),
    })
}

/// Creates a future that completes when a shutdown signal is received.
/// Handles Ctrl+C on all platforms.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Shutdown signal received, stopping server...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("web=info".parse().unwrap())
                .add_directive("scramble_core=info".parse().unwrap()),
        )
        .init();

    let board_file = central_config::get_board_file();
    let board = Board::load(&board_file)
        .with_context(|| format!("failed to load board from {board_file}"))?;
    info!(
        "Loaded {}x{} board from {}",
        board.rows(),
        board.columns(),
        board_file
    );

    let state = Arc::new(AppState {
        board: Arc::new(board),
    });

    // Build router
    let app = create_app(state);

    let addr = format!(
        "{}:{}",
        central_config::get_host(),
        central_config::get_port()
    );
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HealthResponse;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Helper to make a GET request and return response body as string
    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body_str = String::from_utf8(body.to_vec()).unwrap();
        (status, body_str)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let state = create_test_state();
        let app = create_app(state);

        let (status, body) = get(app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let response: HealthResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(response.status, "ok");
    }

    #[tokio::test]
    async fn test_look_returns_initial_board() {
        let state = create_test_state();
        let app = create_app(state);

        let (status, body) = get(app, "/look/alice").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "2x2\ndown\ndown\ndown\ndown\n");
    }

    #[tokio::test]
    async fn test_flip_claims_card() {
        let state = create_test_state();

        let (status, body) = {
            let app = create_app(Arc::clone(&state));
            get(app, "/flip/alice/0/0").await
        };
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "2x2\nmy A\ndown\ndown\ndown\n");

        // Another player sees the card face up but not owned.
        let (_, body) = {
            let app = create_app(Arc::clone(&state));
            get(app, "/look/bob").await
        };
        assert_eq!(body, "2x2\nup A\ndown\ndown\ndown\n");
    }

    #[tokio::test]
    async fn test_flip_out_of_range_is_bad_request() {
        let state = create_test_state();
        let app = create_app(state);

        let (status, body) = get(app, "/flip/alice/9/9").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("outside"));
    }

    #[tokio::test]
    async fn test_flip_non_numeric_coordinate_rejected() {
        let state = create_test_state();
        let app = create_app(state);

        let (status, _) = get(app, "/flip/alice/zero/0").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_second_flip_on_held_card_is_conflict() {
        let state = create_test_state();

        {
            let app = create_app(Arc::clone(&state));
            let (status, _) = get(app, "/flip/alice/0/0").await;
            assert_eq!(status, StatusCode::OK);
        }

        // Alice's second flip targets her own held card.
        let app = create_app(Arc::clone(&state));
        let (status, body) = get(app, "/flip/alice/0/0").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("held"));
    }

    #[tokio::test]
    async fn test_map_rewrites_labels() {
        let state = create_test_state();

        let (status, body) = {
            let app = create_app(Arc::clone(&state));
            get(app, "/map/admin?from=A&to=Z").await
        };
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "2x2\ndown\ndown\ndown\ndown\n");

        let (_, body) = {
            let app = create_app(Arc::clone(&state));
            get(app, "/flip/alice/0/0").await
        };
        assert_eq!(body, "2x2\nmy Z\ndown\ndown\ndown\n");
    }

    #[tokio::test]
    async fn test_map_missing_query_rejected() {
        let state = create_test_state();
        let app = create_app(state);

        let (status, _) = get(app, "/map/admin").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_watch_unblocks_on_board_change() {
        let state = create_test_state();

        let watcher = tokio::spawn({
            let app = create_app(Arc::clone(&state));
            async move { get(app, "/watch/watcher").await }
        });
        // Let the watcher register before changing the board.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!watcher.is_finished());

        {
            let app = create_app(Arc::clone(&state));
            let (status, _) = get(app, "/flip/alice/1/1").await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = tokio::time::timeout(Duration::from_secs(5), watcher)
            .await
            .expect("watcher should wake after the flip")
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "2x2\ndown\ndown\ndown\nup B\n");
    }
}
