use crate::progress::{Progress, SweepStats};
use crate::web;
use anyhow::Context;
use axum::{extract::State, routing::get, Json, Router};
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub progress: Progress,
}

pub fn router(progress: Progress) -> Router {
    Router::new()
        .route("/api/stats", get(handle_stats))
        .route("/health", get(web::health))
        .route("/healthz", get(web::health))
        .layer(CorsLayer::permissive())
        .with_state(AppState { progress })
}

/// Serve sweep progress until the task is aborted
pub async fn run(port: u16, progress: Progress) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind progress endpoint to {}", addr))?;
    tracing::info!("Progress endpoint listening on {}", addr);

    axum::serve(listener, router(progress))
        .await
        .context("Progress endpoint stopped")?;

    Ok(())
}

/// Run the progress endpoint in the background. The sweep keeps going when
/// the endpoint cannot start; the failure is logged.
pub fn spawn(port: u16, progress: Progress) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run(port, progress).await {
            tracing::error!("Progress endpoint unavailable: {:#}", e);
        }
    })
}

/// Get sweep progress
async fn handle_stats(State(state): State<AppState>) -> Json<SweepStats> {
    Json(state.progress.snapshot().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use shared::{RoundStatistic, Winner};
    use std::time::Duration;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health() {
        let app = router(Progress::new(1));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let progress = Progress::new(5);
        progress
            .record(&RoundStatistic {
                winner: Some(Winner::Defender),
                ..RoundStatistic::default()
            })
            .await;

        let response = router(progress)
            .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["rounds_finished"], 1);
        assert_eq!(json["total_rounds"], 5);
        assert_eq!(json["defender_wins"], 1);
        assert_eq!(json["attacker_wins"], 0);
    }

    #[tokio::test]
    async fn test_busy_port_is_reported() {
        let taken = tokio::net::TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = run(port, Progress::new(1)).await.unwrap_err();
        assert!(format!("{:#}", err).contains(&port.to_string()));

        // The background task logs the failure and finishes
        tokio::time::timeout(Duration::from_secs(5), spawn(port, Progress::new(1)))
            .await
            .unwrap()
            .unwrap();
    }
}
