//! # Netward API — the HTTP enforcement surface
//!
//! Three routes. `/verdict` takes a confirmed-threat verdict and enforces
//! it; `/preemptive` takes a pre-confirmation candidate and enforces it
//! only if the safety gate admits it. Gate rejection is a designed
//! outcome and returns 200; only malformed requests get a 4xx.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use netward_core::types::{AlertLevel, EnforcementAction};
use netward_core::NetwardResult;
use netward_response::{
    EnforcementDecisionEngine, GateDecision, PreemptiveCandidate, SafetyGate, Verdict,
};


pub struct ApiState {
    pub engine: Arc<EnforcementDecisionEngine>,
    pub gate: SafetyGate,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/verdict", post(submit_verdict))
        .route("/preemptive", post(submit_preemptive))
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(bind: &str, state: Arc<ApiState>) -> NetwardResult<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(bind = %bind, "Enforcement API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Request / response types ─────────────────────────────────────────────────

/// Incoming verdict. Every field optional so a missing one yields our own
/// 400 with a named field instead of a framework rejection.
#[derive(Debug, Deserialize)]
pub struct VerdictRequest {
    pub source: Option<String>,
    pub predicted_category: Option<String>,
    pub confidence: Option<f64>,
    pub explanation: Option<String>,
    pub recommended_action: Option<String>,
    pub requester_id: Option<String>,
    pub stats: Option<netward_core::types::StatisticsSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct PreemptiveRequest {
    pub source: Option<String>,
    pub alert_level: Option<String>,
    pub current_confidence: Option<f64>,
    pub predicted_confidence: Option<f64>,
    pub requested_action: Option<String>,
    pub requester_id: Option<String>,
    pub category: Option<String>,
    pub trend: Option<String>,
    pub stats: Option<netward_core::types::StatisticsSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct EnforcementResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_taken: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnforcementResponse {
    fn ok(report: &netward_response::EnforcementReport) -> Self {
        Self {
            status: "ok",
            action_taken: Some(report.action_taken.as_str().to_string()),
            success: Some(report.success),
            responder_id: Some(report.responder_id.clone()),
            timestamp: Some(report.timestamp),
            reason: None,
            error: None,
        }
    }

    fn gate_rejected(reason: String) -> Self {
        Self {
            status: "gate_rejected",
            action_taken: None,
            success: None,
            responder_id: None,
            timestamp: None,
            reason: Some(reason),
            error: None,
        }
    }

    fn bad_request(error: String) -> Self {
        Self {
            status: "error",
            action_taken: None,
            success: None,
            responder_id: None,
            timestamp: None,
            reason: None,
            error: Some(error),
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub id: String,
}

// ── Request validation ───────────────────────────────────────────────────────

pub(crate) fn build_verdict(req: VerdictRequest) -> Result<Verdict, String> {
    let source = req.source.filter(|s| !s.trim().is_empty()).ok_or("missing source")?;
    let predicted_category = req
        .predicted_category
        .filter(|s| !s.trim().is_empty())
        .ok_or("missing predicted_category")?;
    let confidence = req.confidence.ok_or("missing confidence")?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(format!("confidence {} outside [0, 1]", confidence));
    }
    let requester_id = req
        .requester_id
        .filter(|s| !s.trim().is_empty())
        .ok_or("missing requester_id")?;
    let recommended_action = match req.recommended_action.as_deref() {
        None => None,
        Some(s) => Some(
            EnforcementAction::parse(s).ok_or_else(|| format!("unknown action '{}'", s))?,
        ),
    };
    Ok(Verdict {
        source,
        predicted_category,
        confidence,
        explanation: req.explanation,
        recommended_action,
        requester_id,
        stats: req.stats,
    })
}

pub(crate) fn build_candidate(req: PreemptiveRequest) -> Result<PreemptiveCandidate, String> {
    let source = req.source.filter(|s| !s.trim().is_empty()).ok_or("missing source")?;
    let alert_level = req.alert_level.as_deref().ok_or("missing alert_level")?;
    let alert_level =
        AlertLevel::parse(alert_level).ok_or_else(|| format!("unknown alert level '{}'", alert_level))?;
    let current_confidence = req.current_confidence.ok_or("missing current_confidence")?;
    let predicted_confidence = req.predicted_confidence.ok_or("missing predicted_confidence")?;
    for (name, value) in [
        ("current_confidence", current_confidence),
        ("predicted_confidence", predicted_confidence),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(format!("{} {} outside [0, 1]", name, value));
        }
    }
    let requested_action = req.requested_action.as_deref().ok_or("missing requested_action")?;
    let requested_action = EnforcementAction::parse(requested_action)
        .ok_or_else(|| format!("unknown action '{}'", requested_action))?;
    let requester_id = req
        .requester_id
        .filter(|s| !s.trim().is_empty())
        .ok_or("missing requester_id")?;
    Ok(PreemptiveCandidate {
        source,
        alert_level,
        current_confidence,
        predicted_confidence,
        requested_action,
        requester_id,
        category: req.category,
        trend: req.trend,
        stats: req.stats,
    })
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "alive",
        id: state.engine.responder_id().to_string(),
    })
}

async fn submit_verdict(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<VerdictRequest>,
) -> (StatusCode, Json<EnforcementResponse>) {
    let verdict = match build_verdict(req) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Rejected verdict request");
            return (StatusCode::BAD_REQUEST, Json(EnforcementResponse::bad_request(e)));
        }
    };

    match state.engine.execute(&verdict) {
        Ok(report) => (StatusCode::OK, Json(EnforcementResponse::ok(&report))),
        Err(e) => {
            warn!(source = %verdict.source, error = %e, "Verdict enforcement rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(EnforcementResponse::bad_request(e.to_string())),
            )
        }
    }
}

async fn submit_preemptive(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<PreemptiveRequest>,
) -> (StatusCode, Json<EnforcementResponse>) {
    let candidate = match build_candidate(req) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Rejected preemptive request");
            return (StatusCode::BAD_REQUEST, Json(EnforcementResponse::bad_request(e)));
        }
    };

    match state.gate.review(&candidate) {
        GateDecision::Rejected { reason } => {
            info!(source = %candidate.source, reason = %reason, "Preemptive request gated");
            (StatusCode::OK, Json(EnforcementResponse::gate_rejected(reason)))
        }
        GateDecision::Approved => match state.engine.execute_preemptive(&candidate) {
            Ok(report) => (StatusCode::OK, Json(EnforcementResponse::ok(&report))),
            Err(e) => (
                StatusCode::BAD_REQUEST,
                Json(EnforcementResponse::bad_request(e.to_string())),
            ),
        },
    }
}
