//! Run endpoints.
//!
//! `x_auth` in the request metadata carries the caller's credential. When it
//! is absent, the `Authorization` header is used instead.

use crate::SharedState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::sse::{Event as SseEvent, Sse},
    response::{IntoResponse, Json, Response},
};
use nexagent_agent::{RunFailure, RunOutcome};
use nexagent_core::citation::Citation;
use nexagent_core::error::Error;
use nexagent_core::message::Message;
use nexagent_core::provider::Usage;
use nexagent_core::request::RunRequest;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Buffered stream events per run before the loop waits on the client.
const STREAM_BUFFER: usize = 64;

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderSummary {
    pub provider: String,
    pub model: String,
    pub tier: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunResponse {
    pub conversation_id: String,
    pub messages: Vec<Message>,
    pub answer: String,
    pub citations: Vec<Citation>,
    pub iterations: u32,
    pub provider: ProviderSummary,
    pub usage: Usage,
}

impl From<RunOutcome> for RunResponse {
    fn from(outcome: RunOutcome) -> Self {
        Self {
            conversation_id: outcome.conversation.id.to_string(),
            messages: outcome.conversation.messages().to_vec(),
            answer: outcome.answer,
            citations: outcome.citations,
            iterations: outcome.iterations,
            provider: ProviderSummary {
                provider: outcome.provider.provider,
                model: outcome.provider.model,
                tier: outcome.provider.tier.as_str().to_string(),
            },
            usage: outcome.usage,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
    pub state: String,
    pub iterations: u32,
    pub messages: Vec<Message>,
}

/// HTTP status for a failed run.
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::PolicyUnsatisfiable { .. } | Error::IterationBudgetExceeded { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Error::Configuration { .. } | Error::InvalidRequest(_) | Error::Serialization(_) => {
            StatusCode::BAD_REQUEST
        }
        Error::Provider(_) => StatusCode::BAD_GATEWAY,
        Error::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let failure = self.0;
        let status = status_for(&failure.error);
        let body = ErrorResponse {
            error: failure.error.to_string(),
            kind: failure.error.kind().to_string(),
            state: failure.last_state.to_string(),
            iterations: failure.iterations,
            messages: failure.conversation.messages().to_vec(),
        };
        (status, Json(body)).into_response()
    }
}

/// A failed run rendered as an HTTP error.
pub struct ApiFailure(pub RunFailure);

fn with_header_auth(mut request: RunRequest, headers: &HeaderMap) -> RunRequest {
    if request.metadata.x_auth.is_none() {
        request.metadata.x_auth = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
    }
    request
}

/// `POST /runs/wait`: run to completion.
///
/// If the client disconnects, axum drops this future and with it the run.
pub async fn wait_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunResponse>, ApiFailure> {
    info!(assistant = %request.assistant_id, "runs/wait request");
    let request = with_header_auth(request, &headers);

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    state
        .runtime
        .run(request, cancel, None)
        .await
        .map(|outcome| Json(outcome.into()))
        .map_err(ApiFailure)
}

/// `POST /runs/stream`: run with a server-sent event per agent event.
///
/// The stream ends after the terminal `done` or `error` event. Dropping the
/// response body cancels the run.
pub async fn stream_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<RunRequest>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    info!(assistant = %request.assistant_id, "runs/stream request");
    let request = with_header_auth(request, &headers);

    let (tx, rx) = tokio::sync::mpsc::channel(STREAM_BUFFER);
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let runtime = state.runtime.clone();
    tokio::spawn(async move {
        let _ = runtime.run(request, cancel, Some(tx)).await;
    });

    let stream = ReceiverStream::new(rx).map(move |event| {
        let _alive = &guard;
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(event.event_type()).data(data))
    });

    Sse::new(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use crate::{GatewayState, build_router};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use nexagent_agent::LoopSettings;
    use nexagent_core::message::MessageToolCall;
    use tower::ServiceExt;

    fn run_body(assistant: &str, text: &str) -> Body {
        let body = serde_json::json!({
            "assistant_id": assistant,
            "input": {"messages": [{"role": "user", "content": text}]},
            "metadata": {"x_auth": "Bearer sk-live-123", "llm_tier": "flash"}
        });
        Body::from(body.to_string())
    }

    fn post(uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap()
    }

    fn looping_call() -> Message {
        let mut message = Message::assistant("");
        message.tool_calls = vec![MessageToolCall {
            id: "c1".into(),
            name: "missing_tool".into(),
            arguments: "{}".into(),
        }];
        message
    }

    #[tokio::test]
    async fn wait_returns_answer() {
        let provider = ScriptedProvider::new(vec![Message::assistant("Hello from the agent")]);
        let app = build_router(GatewayState::new(runtime(provider.clone(), LoopSettings::default())));

        let response = app.oneshot(post("/runs/wait", run_body("react", "hi"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let run: RunResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(run.answer, "Hello from the agent");
        assert_eq!(run.iterations, 1);
        assert_eq!(run.provider.provider, "scripted");
        assert_eq!(run.provider.tier, "flash");
        assert_eq!(run.messages.len(), 3);

        let body = String::from_utf8_lossy(&body);
        assert!(!body.contains("sk-live-123"));
    }

    #[tokio::test]
    async fn unknown_assistant_is_bad_request() {
        let provider = ScriptedProvider::new(vec![]);
        let app = build_router(GatewayState::new(runtime(provider, LoopSettings::default())));

        let response = app.oneshot(post("/runs/wait", run_body("pirate", "hi"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.kind, "configuration_error");
        assert_eq!(err.iterations, 0);
    }

    #[tokio::test]
    async fn budget_exhaustion_is_unprocessable() {
        let provider = ScriptedProvider::new(vec![looping_call()]);
        let settings = LoopSettings {
            max_iterations: 2,
            ..LoopSettings::default()
        };
        let app = build_router(GatewayState::new(runtime(provider, settings)));

        let response = app.oneshot(post("/runs/wait", run_body("react", "loop"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.kind, "iteration_budget_exceeded");
        assert_eq!(err.state, "reasoning");
        assert_eq!(err.iterations, 2);
        // system, user, then two (call, result) pairs
        assert_eq!(err.messages.len(), 6);
    }

    #[tokio::test]
    async fn uncited_dental_answer_is_unprocessable() {
        let provider = ScriptedProvider::new(vec![Message::assistant("Take amoxicillin.")]);
        let app = build_router(GatewayState::new(runtime_with_literature(provider)));

        let response = app
            .oneshot(post("/runs/wait", run_body("dental_agent", "Amoxicillin dose?")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.kind, "policy_unsatisfiable");
        assert_eq!(err.state, "guarding");
    }

    #[tokio::test]
    async fn dental_run_without_evidence_tool_is_bad_request() {
        let provider = ScriptedProvider::new(vec![Message::assistant("Take amoxicillin.")]);
        let app = build_router(GatewayState::new(runtime(provider.clone(), LoopSettings::default())));

        let response = app
            .oneshot(post("/runs/wait", run_body("dental_agent", "Amoxicillin dose?")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.kind, "configuration_error");
        assert!(provider.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn authorization_header_fills_missing_x_auth() {
        let mut call = Message::assistant("");
        call.tool_calls = vec![MessageToolCall {
            id: "w1".into(),
            name: "whoami".into(),
            arguments: "{}".into(),
        }];
        let provider = ScriptedProvider::new(vec![call, Message::assistant("ok")]);
        let app = build_router(GatewayState::new(runtime_with_whoami(provider)));

        let body = serde_json::json!({
            "assistant_id": "react",
            "input": {"messages": [{"role": "user", "content": "who am I"}]}
        });
        let req = Request::builder()
            .method("POST")
            .uri("/runs/wait")
            .header("content-type", "application/json")
            .header("authorization", "Bearer from-header")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let run: RunResponse = serde_json::from_slice(&body).unwrap();
        let tool = run.messages.iter().find(|m| m.tool_call_id.is_some()).unwrap();
        assert_eq!(tool.content, "token=[REDACTED]");
    }

    #[tokio::test]
    async fn stream_emits_events_until_done() {
        let provider = ScriptedProvider::new(vec![looping_call(), Message::assistant("final")]);
        let app = build_router(GatewayState::new(runtime(provider, LoopSettings::default())));

        let response = app.oneshot(post("/runs/stream", run_body("react", "hi"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8_lossy(&body);
        let events: Vec<&str> = text
            .lines()
            .filter_map(|l| l.strip_prefix("event: "))
            .collect();
        assert_eq!(events, vec!["tool_call", "tool_result", "answer", "done"]);
        assert!(text.contains("unknown tool 'missing_tool'"));
    }

    #[tokio::test]
    async fn stream_reports_failures_as_error_event() {
        let provider = ScriptedProvider::new(vec![]);
        let app = build_router(GatewayState::new(runtime(provider, LoopSettings::default())));

        let response = app.oneshot(post("/runs/stream", run_body("pirate", "hi"))).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("event: error"));
        assert!(text.contains("configuration_error"));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(status_for(&Error::Cancelled), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_for(&Error::UnknownTool("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
