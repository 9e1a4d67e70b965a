//! HTTP API for the pull request reviewer service
//!
//! Routes map one-to-one onto [`ReviewService`] operations. Bodies and query
//! parameters are camelCase JSON; errors come back as `{"error": "..."}`
//! with a status derived from the error kind (see [`error::ApiError`]).

pub mod error;
pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use reviewer_core::config::ServerConfig;
use reviewer_core::{ReviewService, WorkflowMetrics};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub service: ReviewService,
    pub metrics: Arc<WorkflowMetrics>,
}

impl AppState {
    pub fn new(service: ReviewService, metrics: Arc<WorkflowMetrics>) -> Self {
        Self { service, metrics }
    }
}

/// Build the application router with tracing, CORS and request timeout layers
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    use handlers::{health, pull_requests, statistics, teams, users};

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .route("/teams", get(teams::list_teams).post(teams::create_team))
        .route("/teams/{team_id}", get(teams::get_team).delete(teams::delete_team))
        .route(
            "/teams/{team_id}/users",
            post(teams::add_user).delete(teams::remove_user),
        )
        .route("/teams/{team_id}/users/deactivate", post(users::bulk_deactivate))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{user_id}", get(users::get_user).patch(users::update_user))
        .route(
            "/pull-requests",
            get(pull_requests::list_pull_requests).post(pull_requests::create_pull_request),
        )
        .route("/pull-requests/{pr_id}", get(pull_requests::get_pull_request))
        .route(
            "/pull-requests/{pr_id}/reviewers",
            post(pull_requests::add_reviewer).put(pull_requests::reassign_reviewer),
        )
        .route("/pull-requests/{pr_id}/merge", post(pull_requests::merge_pull_request))
        .route("/pull-requests/{pr_id}/close", post(pull_requests::close_pull_request))
        .route("/statistics", get(statistics::get_statistics))
        .with_state(state)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Bind and serve until Ctrl-C or SIGTERM
pub async fn serve(state: AppState, config: &ServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %listener.local_addr()?, "Server listening");

    axum::serve(listener, router(state, config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
