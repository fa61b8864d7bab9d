use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::routes::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub llm: HealthCheck,
    pub form: HealthCheck,
    pub checked_at: String,
}

/// Bootstrap refuses to start without an API key, so a serving process always
/// has a configured model.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "intake-server runtime initialized".to_string(),
        },
        llm: HealthCheck {
            status: "ready",
            detail: format!("model `{}` configured", state.llm.model),
        },
        form: HealthCheck {
            status: "ready",
            detail: format!(
                "{} fields from {}",
                state.tracker.form().len(),
                state.form_source
            ),
        },
        checked_at: Utc::now().to_rfc3339(),
    })
}
