//! HTTP Endpoints
//!
//! REST API for classification and clarification sessions.

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use aicc_agent::{Outcome, SessionContext};
use aicc_core::{ClassificationResult, IntentClassifier, MetaInfo};
use aicc_llm::LlmBackend;

use crate::auth::auth_middleware;
use crate::metrics::{metrics_handler, record_request};
use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let config = state.config.read();
    let cors_layer = build_cors_layer(&config.server.cors_origins, config.server.cors_enabled);
    drop(config);

    Router::new()
        .route("/api/classify", post(classify))
        .route("/api/conversations", post(start_conversation).get(list_conversations))
        .route("/api/conversations/:id/answer", post(submit_answer))
        .route("/api/conversations/:id", delete(abandon_conversation))
        .route("/api/categories", get(list_categories))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/admin/reload-config", post(reload_config))
        .layer(axum::middleware::from_fn(auth_middleware))
        .layer(Extension(state.config.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// CORS from configured origins; permissive when disabled
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to localhost:3000");
        return layer.allow_origin(HeaderValue::from_static("http://localhost:3000"));
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    layer.allow_origin(parsed_origins)
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
    pub top_k: Option<usize>,
}

/// POST /api/classify
async fn classify(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ClassificationResult>, ServerError> {
    let top_k = request
        .top_k
        .unwrap_or(state.orchestrator.config().top_k);
    let result = state.orchestrator.classifier().predict(&request.text, top_k);
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => ServerError::from(e.clone()).status(),
    };
    record_request("classify", status);
    Ok(Json(result?))
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub query: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub turn_id: u32,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: String,
}

/// Response for both session endpoints
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversationResponse {
    Resolved {
        conversation_id: String,
        meta_info: Box<MetaInfo>,
    },
    AwaitingAnswer {
        session_id: String,
        conversation_id: String,
        question: String,
        turn: usize,
    },
}

/// POST /api/conversations
async fn start_conversation(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<ConversationResponse>, ServerError> {
    if request.query.trim().is_empty() {
        record_request("start", StatusCode::BAD_REQUEST);
        return Err(ServerError::InvalidRequest("query is empty".to_string()));
    }

    let ctx = SessionContext {
        conversation_id: request.conversation_id,
        turn_id: request.turn_id,
    };
    let (session, outcome) = state
        .orchestrator
        .start(&request.query, ctx)
        .await
        .map_err(|e| {
            let err = ServerError::from(e);
            record_request("start", err.status());
            err
        })?;

    let conversation_id = session.conversation_id().to_string();
    let response = match outcome {
        Outcome::Resolved(meta) => ConversationResponse::Resolved {
            conversation_id,
            meta_info: Box::new(meta),
        },
        Outcome::AwaitingAnswer { question, turn } => {
            let session_id = state.sessions.insert(session)?;
            ConversationResponse::AwaitingAnswer {
                session_id,
                conversation_id,
                question,
                turn,
            }
        }
    };

    record_request("start", StatusCode::OK);
    Ok(Json(response))
}

/// POST /api/conversations/:id/answer
async fn submit_answer(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<ConversationResponse>, ServerError> {
    let mut session = state.sessions.checkout(&session_id)?;
    let result = state
        .orchestrator
        .submit_answer(&mut session, &request.answer)
        .await;

    let conversation_id = session.conversation_id().to_string();
    session.checkin();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            let err = ServerError::from(e);
            record_request("answer", err.status());
            return Err(err);
        }
    };

    record_request("answer", StatusCode::OK);
    Ok(Json(match outcome {
        Outcome::Resolved(meta) => ConversationResponse::Resolved {
            conversation_id,
            meta_info: Box::new(meta),
        },
        Outcome::AwaitingAnswer { question, turn } => ConversationResponse::AwaitingAnswer {
            session_id,
            conversation_id,
            question,
            turn,
        },
    }))
}

/// DELETE /api/conversations/:id
async fn abandon_conversation(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    if state.sessions.remove(&session_id) {
        ::metrics::counter!("aicc_sessions_total", "outcome" => "abandoned").increment(1);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::SessionNotFound(session_id))
    }
}

/// GET /api/conversations
async fn list_conversations(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.sessions.list();
    Json(serde_json::json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

/// GET /api/categories
async fn list_categories(State(state): State<AppState>) -> Json<serde_json::Value> {
    let registry = state.orchestrator.registry();
    let categories: Vec<_> = registry
        .all_names()
        .iter()
        .filter_map(|name| registry.get(name))
        .map(|info| {
            serde_json::json!({
                "name": info.name,
                "domain_code": info.domain_code,
                "domain_name": info.domain_name,
                "intent_code": info.intent_code,
                "category_code": info.category_code,
                "rag_index": info.rag_index,
            })
        })
        .collect();
    let thresholds = registry.thresholds();

    Json(serde_json::json!({
        "count": categories.len(),
        "thresholds": {
            "threshold_a": thresholds.threshold_a,
            "threshold_b_low": thresholds.threshold_b_low,
        },
        "categories": categories,
    }))
}

/// GET /health
///
/// Liveness plus component summary; always 200 while the process serves.
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = if state.model_status.available {
        "healthy"
    } else {
        "degraded"
    };
    Json(serde_json::json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {
            "classifier": &*state.model_status,
            "sessions": {
                "active": state.sessions.count(),
                "max": state.sessions.max_sessions(),
            },
            "fallbacks": state.orchestrator.fallback_count(),
        }
    }))
}

/// GET /ready
///
/// Ready when the classifier is loaded and the LLM backend answers.
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let mut ready = state.model_status.available;

    let llm_status = match &state.llm_backend {
        Some(backend) => {
            let probe = tokio::time::timeout(
                std::time::Duration::from_secs(2),
                backend.is_available(),
            )
            .await;
            match probe {
                Ok(true) => "ok",
                Ok(false) => {
                    ready = false;
                    "unreachable"
                }
                Err(_) => {
                    ready = false;
                    "timeout"
                }
            }
        }
        None => "not_configured",
    };

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": {
                "classifier": &*state.model_status,
                "llm_backend": llm_status,
            }
        })),
    )
}

/// POST /admin/reload-config
async fn reload_config(State(state): State<AppState>) -> impl IntoResponse {
    match state.reload_config() {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "success" })),
        ),
        Err(e) => {
            tracing::error!("Config reload failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "status": "error", "message": e })),
            )
        }
    }
}
