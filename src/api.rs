//! HTTP surface of the alert service: the chat-side monitor endpoint and
//! the explicit safety-alert trigger. Both hand work to the orchestrator
//! and answer immediately; neither ever waits on delivery.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::classifier::RiskVerdict;
use crate::geo::GeoPoint;
use crate::orchestrator::CrisisOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: CrisisOrchestrator,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/monitor", post(monitor))
        .route("/safety-alert", post(safety_alert))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonitorReq {
    user_id: String,
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MonitorResp {
    verdict: RiskVerdict,
    reply: Option<String>,
    escalated: bool,
}

/// Chat request path: classify synchronously, spawn escalation when needed,
/// answer with the verdict. The escalation handle is dropped here; the
/// background task outlives this request by design.
async fn monitor(State(state): State<AppState>, Json(body): Json<MonitorReq>) -> Json<MonitorResp> {
    let outcome = state.orchestrator.handle_message(&body.user_id, &body.text);
    Json(MonitorResp {
        escalated: outcome.escalation.is_some(),
        reply: outcome.reply.map(str::to_string),
        verdict: outcome.verdict,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SafetyAlertReq {
    user_id: String,
    crisis_snippet: String,
    #[serde(default)]
    user_location: Option<GeoPoint>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SafetyAlertResp {
    message: &'static str,
    status: &'static str,
    no_guardian: bool,
}

/// Explicit trigger, mirroring the original client contract: acknowledge
/// right away with the guardian flag, let the pipeline run detached.
async fn safety_alert(
    State(state): State<AppState>,
    Json(body): Json<SafetyAlertReq>,
) -> Json<SafetyAlertResp> {
    // Clients send the (0,0) sentinel for "unknown"; normalize it before
    // it reaches the resolver.
    let hint = body.user_location.and_then(GeoPoint::usable);

    let ack = state
        .orchestrator
        .trigger_alert(&body.user_id, &body.crisis_snippet, hint)
        .await;

    Json(SafetyAlertResp {
        message: "Safety alert initiated",
        status: "processing",
        no_guardian: ack.no_guardian,
    })
}
