//! HTTP gateway for nexagent.
//!
//! Exposes the run contract over HTTP:
//!
//! - `GET  /health`       liveness and version
//! - `GET  /assistants`   assistant ids and descriptions
//! - `GET  /tools`        tools registered in this process
//! - `GET  /events`       SSE stream of domain events
//! - `POST /runs/wait`    run to completion, JSON response
//! - `POST /runs/stream`  run with an SSE stream of agent events
//!
//! Built on Axum.

pub mod runs;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    response::Json,
    response::sse::{Event as SseEvent, Sse},
    routing::{get, post},
};
use nexagent_agent::{AgentRuntime, AssistantSummary};
use nexagent_core::event::DomainEvent;
use nexagent_core::provider::ToolDefinition;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub runtime: Arc<AgentRuntime>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(runtime: AgentRuntime) -> SharedState {
        Arc::new(Self {
            runtime: Arc::new(runtime),
        })
    }
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .route("/assistants", get(assistants_handler))
        .route("/tools", get(tools_handler))
        .route("/events", get(events_handler))
        .route("/runs/wait", post(runs::wait_handler))
        .route("/runs/stream", post(runs::stream_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: nexagent_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let runtime = AgentRuntime::from_config(&config);
    let app = build_router(GatewayState::new(runtime));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

#[derive(Serialize)]
pub struct AssistantListResponse {
    pub assistants: Vec<AssistantSummary>,
    pub count: usize,
}

async fn assistants_handler(State(state): State<SharedState>) -> Json<AssistantListResponse> {
    let assistants = state.runtime.catalog().list();
    Json(AssistantListResponse {
        count: assistants.len(),
        assistants,
    })
}

#[derive(Serialize, Deserialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolDefinition>,
    pub count: usize,
}

async fn tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let tools = state.runtime.tools().list_schemas();
    Json(ToolListResponse {
        count: tools.len(),
        tools,
    })
}

/// `GET /events`: SSE stream of domain events from every run.
async fn events_handler(
    State(state): State<SharedState>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.runtime.events().subscribe();
    let stream = tokio_stream::wrappers::BroadcastStream::new(rx)
        .filter_map(|result| result.ok())
        .map(|event| {
            let data = serde_json::to_string(event.as_ref()).unwrap_or_default();
            let name = match event.as_ref() {
                DomainEvent::ToolExecuted { .. } => "tool_executed",
                DomainEvent::ResponseGenerated { .. } => "response_generated",
                DomainEvent::PolicyRejected { .. } => "policy_rejected",
                DomainEvent::RunFinished { .. } => "run_finished",
            };
            Ok(SseEvent::default().event(name).data(data))
        });

    Sse::new(stream)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use nexagent_agent::LoopSettings;
    use nexagent_core::message::Message;
    use tower::ServiceExt;

    fn app() -> Router {
        let provider = ScriptedProvider::new(vec![Message::assistant("hi")]);
        build_router(GatewayState::new(runtime(provider, LoopSettings::default())))
    }

    #[tokio::test]
    async fn health_endpoint() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn list_assistants() {
        let req = Request::builder()
            .uri("/assistants")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["assistants"][0]["id"], "dental_agent");
        assert_eq!(json["assistants"][1]["id"], "react");
    }

    #[tokio::test]
    async fn list_tools_empty_registry() {
        let req = Request::builder()
            .uri("/tools")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(req).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: ToolListResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.count, 0);
    }
}
