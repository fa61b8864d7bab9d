//! Conversation endpoints.
//!
//! - `POST /chat`   : one turn against the form loaded at startup
//! - `POST /ask`    : one turn against a form supplied in the request body
//! - `GET  /health` : readiness (see `health`)
//!
//! Both turn endpoints answer with the same body: the model's message, the
//! merged record, and the tracker's verdict on what is still missing.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use intake_agent::{AgentRuntime, TurnInput, TurnReply, FALLBACK_MESSAGE};
use intake_core::config::AppConfig;
use intake_core::form::record::{record_from_json, record_to_json};
use intake_core::{
    ApplicationError, CompletionTracker, DomainError, FieldDefinition, FieldType, FormDefinition,
    InterfaceError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::health;

const CONNECTION_TROUBLE_MESSAGE: &str = "I'm having trouble connecting. Please try again.";

#[derive(Clone, Debug)]
pub struct LlmStatus {
    pub model: String,
}

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<CompletionTracker>,
    pub runtime: AgentRuntime,
    pub llm: LlmStatus,
    /// Where the startup form came from, for `/health`.
    pub form_source: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/ask", post(ask))
        .route("/health", get(health::health))
        .with_state(state)
}

pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.cors_allows_any_origin() {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let origins = config
        .server
        .cors_allow_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(
                    event_name = "server.cors.invalid_origin",
                    correlation_id = "bootstrap",
                    origin = %origin,
                    "ignoring invalid cors origin"
                );
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_message: String,
    #[serde(default)]
    pub existing_data: Option<Value>,
    /// The question the assistant asked last turn.
    #[serde(default)]
    pub ai_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub user_message: String,
    pub fields: Vec<AskField>,
    #[serde(default)]
    pub existing_data: Option<Value>,
    #[serde(default)]
    pub ai_message: Option<String>,
    #[serde(default)]
    pub start: bool,
}

#[derive(Debug, Deserialize)]
pub struct AskField {
    pub name: String,
    #[serde(default)]
    pub datatype: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl AskField {
    fn into_definition(self) -> FieldDefinition {
        let field_type =
            self.datatype.as_deref().map(FieldType::parse_lenient).unwrap_or_default();
        FieldDefinition::new(self.name.trim(), field_type, self.description.trim())
    }
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct TurnResponse {
    pub ai_message: String,
    pub existing_data: Value,
    pub completed: bool,
    pub next_field: Option<String>,
    pub missing_fields: Vec<String>,
}

impl From<TurnReply> for TurnResponse {
    fn from(reply: TurnReply) -> Self {
        Self {
            ai_message: reply.ai_message,
            existing_data: record_to_json(&reply.outcome.record),
            completed: reply.outcome.complete,
            next_field: reply.outcome.next_field,
            missing_fields: reply.outcome.missing_fields,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    correlation_id: String,
    ai_message: &'static str,
    existing_data: Value,
    completed: bool,
}

/// Interface error plus the record the caller sent, echoed back so a client
/// never loses collected answers on failure.
#[derive(Debug)]
pub struct ApiError {
    error: InterfaceError,
    existing_data: Value,
}

impl ApiError {
    fn new(error: InterfaceError, existing_data: Value) -> Self {
        Self { error, existing_data }
    }

    fn bad_request(
        correlation_id: &str,
        message: impl Into<String>,
        existing_data: Value,
    ) -> Self {
        Self::new(
            InterfaceError::BadRequest {
                message: message.into(),
                correlation_id: correlation_id.to_string(),
            },
            existing_data,
        )
    }

    pub fn status(&self) -> StatusCode {
        match self.error {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (detail, ai_message) = match &self.error {
            InterfaceError::BadRequest { message, .. } => {
                (Some(message.clone()), FALLBACK_MESSAGE)
            }
            _ => (None, CONNECTION_TROUBLE_MESSAGE),
        };

        let body = ErrorBody {
            error: self.error.user_message(),
            detail,
            correlation_id: self.error.correlation_id().to_string(),
            ai_message,
            existing_data: self.existing_data,
            completed: false,
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<TurnResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let Json(request) = payload.map_err(|rejection| {
        ApiError::bad_request(&correlation_id, rejection.body_text(), empty_object())
    })?;

    let existing = request.existing_data.unwrap_or_else(empty_object);
    let record = record_from_json(&existing);
    let start =
        request.ai_message.is_none() && record.values().all(|value| value.trim().is_empty());

    info!(
        event_name = "server.chat.received",
        correlation_id = %correlation_id,
        fields_sent = record.len(),
        start,
        "chat turn received"
    );

    run_turn(
        &state.runtime,
        &state.tracker,
        TurnInput {
            correlation_id: &correlation_id,
            user_message: &request.user_message,
            record: &record,
            last_question: request.ai_message.as_deref(),
            start,
        },
        existing,
    )
    .await
}

pub async fn ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<TurnResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let Json(request) = payload.map_err(|rejection| {
        ApiError::bad_request(&correlation_id, rejection.body_text(), empty_object())
    })?;

    let existing = request.existing_data.unwrap_or_else(empty_object);
    let fields = request.fields.into_iter().map(AskField::into_definition).collect();
    let form = FormDefinition::new(fields).map_err(|error| {
        warn!(
            event_name = "server.ask.invalid_form",
            correlation_id = %correlation_id,
            error = %error,
            "rejecting ad-hoc form"
        );
        ApiError::new(
            ApplicationError::from(DomainError::from(error)).into_interface(&correlation_id),
            existing.clone(),
        )
    })?;
    let tracker = CompletionTracker::new(form);
    let record = record_from_json(&existing);

    info!(
        event_name = "server.ask.received",
        correlation_id = %correlation_id,
        form_fields = tracker.form().len(),
        start = request.start,
        "ad-hoc turn received"
    );

    run_turn(
        &state.runtime,
        &tracker,
        TurnInput {
            correlation_id: &correlation_id,
            user_message: &request.user_message,
            record: &record,
            last_question: request.ai_message.as_deref(),
            start: request.start,
        },
        existing,
    )
    .await
}

async fn run_turn(
    runtime: &AgentRuntime,
    tracker: &CompletionTracker,
    input: TurnInput<'_>,
    existing: Value,
) -> Result<Json<TurnResponse>, ApiError> {
    let correlation_id = input.correlation_id.to_string();
    match runtime.handle_turn(tracker, input).await {
        Ok(reply) => Ok(Json(TurnResponse::from(reply))),
        Err(llm_error) => {
            error!(
                event_name = "server.turn.llm_failed",
                correlation_id = %correlation_id,
                error = %llm_error,
                "language model call failed"
            );
            Err(ApiError::new(
                ApplicationError::from(llm_error).into_interface(correlation_id),
                existing,
            ))
        }
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}
