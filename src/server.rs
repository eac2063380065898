use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{any, get},
    Router,
};
use reqwest::Client;
use tracing::info;

use crate::job::Endpoints;
use crate::on_demand::{self, TriggerResponse};

struct AppState {
    http: Client,
    endpoints: Endpoints,
}

impl IntoResponse for TriggerResponse {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, self.body).into_response()
    }
}

pub fn router(http: Client, endpoints: Endpoints) -> Router {
    let state = Arc::new(AppState { http, endpoints });
    Router::new()
        .route("/run-now", any(run_now))
        .route("/healthz", get(|| async { "OK" }))
        .with_state(state)
}

/// Reads the process environment on every request, so a fixed `.env` or
/// redeployed variables take effect without a restart.
async fn run_now(State(state): State<Arc<AppState>>, method: Method) -> TriggerResponse {
    info!(%method, "Manual run requested");
    on_demand::handle_request(
        &method,
        |name| std::env::var(name).ok(),
        &state.http,
        &state.endpoints,
        chrono::Utc::now(),
    )
    .await
}

pub async fn serve(listen: &str, http: Client, endpoints: Endpoints) -> anyhow::Result<()> {
    let app = router(http, endpoints);
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("Manual trigger listening on {listen}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_other_methods_over_http() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(Client::new(), Endpoints::default()))
                .await
                .unwrap();
        });

        let client = Client::new();
        let resp = client
            .put(format!("http://{}/run-now", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 405);
        assert_eq!(resp.text().await.unwrap(), "Method Not Allowed");

        let resp = client
            .get(format!("http://{}/healthz", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    }
}
