//! Axum route handlers for the expert panel HTTP server.
//!
//! # Routes
//!
//! - `GET  /health`      - Returns `{"status": "ok", "version": ..., "service": "expert-panel"}`
//! - `GET  /specialists` - Registry listing, in routing order
//! - `POST /panel`       - Runs a panel for one message

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::PanelError;
use crate::panel::{ExpertPanel, PanelOutput};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub panel: Arc<ExpertPanel>,
}

impl AppState {
    pub fn new(panel: ExpertPanel) -> Self {
        Self { panel: Arc::new(panel) }
    }
}

/// Body of `POST /panel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelRequest {
    pub message: String,
    /// Existing router answer; parsed instead of calling the router.
    #[serde(default)]
    pub router_output: Option<String>,
    /// Fixed panel; bypasses routing entirely. Takes precedence over `router_output`.
    #[serde(default)]
    pub specialists: Option<Vec<String>>,
}

/// One entry of `GET /specialists`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistSummary {
    pub id: String,
    pub display_name: String,
    pub expertise: String,
    pub emoji: String,
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/specialists", get(specialists_handler))
        .route("/panel", post(panel_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health - liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "expert-panel",
    }))
}

/// GET /specialists - the registry in routing order.
async fn specialists_handler(State(state): State<AppState>) -> Json<Vec<SpecialistSummary>> {
    Json(
        state
            .panel
            .registry()
            .iter()
            .map(|p| SpecialistSummary {
                id: p.id.clone(),
                display_name: p.display_name.clone(),
                expertise: p.expertise.clone(),
                emoji: p.emoji.clone(),
            })
            .collect(),
    )
}

/// POST /panel - route, execute and return the full [`PanelOutput`].
async fn panel_handler(
    State(state): State<AppState>,
    Json(request): Json<PanelRequest>,
) -> Result<Json<PanelOutput>, (StatusCode, Json<Value>)> {
    let panel = &state.panel;

    let result = match (&request.specialists, &request.router_output) {
        (Some(ids), _) => panel.run_with_selection(&request.message, ids).await,
        (None, Some(router_output)) => panel.run_with_router_output(&request.message, router_output).await,
        (None, None) => panel.run(&request.message).await,
    };

    match result {
        Ok(output) => {
            tracing::info!(
                run_id = %output.run_id,
                selection = %output.routing.selection,
                degraded = output.routing.degraded,
                "panel request completed"
            );
            Ok(Json(output))
        }
        Err(err) => {
            let status = status_for(&err);
            tracing::warn!(status = status.as_u16(), error = %err, "panel request failed");
            Err((
                status,
                Json(serde_json::json!({
                    "error": err.to_string(),
                    "unit_id": err.unit_id(),
                })),
            ))
        }
    }
}

/// HTTP status for a pipeline error.
pub fn status_for(err: &PanelError) -> StatusCode {
    match err {
        PanelError::InputEmpty => StatusCode::BAD_REQUEST,
        PanelError::UnitExecution { .. } | PanelError::RouterFailure { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::PanelConfig;
    use crate::llms::testing::ScriptedGenerator;
    use crate::llms::GeneratorSet;
    use crate::specialists::SpecialistRegistry;

    fn app(generator: ScriptedGenerator) -> Router {
        let panel = ExpertPanel::new(
            Arc::new(SpecialistRegistry::builtin().unwrap()),
            PanelConfig::default(),
            GeneratorSet::new(Arc::new(generator)),
        );
        app_router(AppState::new(panel))
    }

    fn script() -> ScriptedGenerator {
        ScriptedGenerator::new("Some advice.")
            .reply("Available experts:", "Selected experts: roger_martin.")
            .reply("Compile all expert responses", "## 🎯 Key Insights from Expert Panel\n...")
            .reply("Review the synthesized reply", "APPROVED")
    }

    fn post_panel(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/panel")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app(script()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::VERSION);
        assert_eq!(json["service"], "expert-panel");
    }

    #[tokio::test]
    async fn test_specialists_endpoint() {
        let request = Request::builder().uri("/specialists").body(Body::empty()).unwrap();
        let response = app(script()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        let list = json.as_array().unwrap();
        assert_eq!(list.len(), 5);
        assert_eq!(list[0]["id"], "simon_sinek");
        assert_eq!(list[4]["emoji"], "🤝");
    }

    #[tokio::test]
    async fn test_panel_routes_and_executes() {
        let response = app(script())
            .oneshot(post_panel(serde_json::json!({"message": "How do we win the market?"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["routing"]["selection"], serde_json::json!(["roger_martin"]));
        assert_eq!(json["routing"]["degraded"], false);
        assert_eq!(json["units"].as_array().unwrap().len(), 4);
        assert_eq!(json["verdict"], "approved");
    }

    #[tokio::test]
    async fn test_panel_with_fixed_specialists() {
        let response = app(script())
            .oneshot(post_panel(serde_json::json!({
                "message": "Help",
                "specialists": ["chris_voss", "simon_sinek"],
                "router_output": "ignored: julie_zhuo",
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(
            json["routing"]["selection"],
            serde_json::json!(["chris_voss", "simon_sinek"])
        );
    }

    #[tokio::test]
    async fn test_panel_with_router_output() {
        let response = app(script())
            .oneshot(post_panel(serde_json::json!({
                "message": "Help",
                "router_output": "no idea",
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["routing"]["degraded"], true);
        assert_eq!(json["routing"]["router_output"], "no idea");
    }

    #[tokio::test]
    async fn test_empty_message_is_bad_request() {
        let response = app(script())
            .oneshot(post_panel(serde_json::json!({"message": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = json_body(response).await;
        assert!(json["error"].as_str().unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn test_unit_failure_is_bad_gateway() {
        let generator = script().fail_on("Compile all expert responses");
        let response = app(generator)
            .oneshot(post_panel(serde_json::json!({"message": "Strategy please"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let json = json_body(response).await;
        assert_eq!(json["unit_id"], "synthesis");
    }

    #[test]
    fn test_status_for_defect() {
        let err = PanelError::defect("synthesis", "broken");
        assert_eq!(status_for(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
