//! End-to-end tests: HTTP request in, tool dispatch, guard, JSON out.
//!
//! Only the model and the search backend are scripted; the resolver,
//! registry gating, reasoning loop, guard and gateway are the real ones.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use nexagent_agent::{AgentRuntime, AssistantCatalog, LoopSettings};
use nexagent_core::error::{ProviderError, ToolError};
use nexagent_core::message::{Message, MessageToolCall};
use nexagent_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use nexagent_core::tool::{Credentials, RegistryBuilder};
use nexagent_gateway::{GatewayState, build_router};
use nexagent_providers::{ProviderResolver, ProviderRouter};
use nexagent_tools::DentalLiteratureTool;
use nexagent_tools::search::{SearchBackend, SearchHit, SearchQuery};
use tower::ServiceExt;

const GATE: &str = "TAVILY_API_KEY";

struct ScriptedProvider {
    script: Vec<Message>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(script: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            script,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let n = requests.len();
        requests.push(request);
        let message = self
            .script
            .get(n)
            .or(self.script.last())
            .cloned()
            .expect("empty script");
        Ok(ProviderResponse {
            message,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "e2e-model".into(),
        })
    }
}

struct LiteratureIndex {
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl SearchBackend for LiteratureIndex {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, ToolError> {
        self.queries.lock().unwrap().push(query.query.clone());
        Ok(vec![
            SearchHit {
                title: "Fluoride varnish for caries prevention".into(),
                url: "https://www.ada.org/fluoride-varnish".into(),
                content: "Varnish applied twice yearly reduces caries.".into(),
                published_date: Some("2023-05-01".into()),
            },
            SearchHit {
                title: "Topical fluoride review".into(),
                url: "https://jada.com/topical".into(),
                content: "Systematic review.".into(),
                published_date: None,
            },
        ])
    }
}

fn tool_call(name: &str, args: serde_json::Value) -> Message {
    let mut msg = Message::assistant("Let me look that up.");
    msg.tool_calls = vec![MessageToolCall {
        id: format!("call_{name}"),
        name: name.into(),
        arguments: args.to_string(),
    }];
    msg
}

fn app(provider: Arc<ScriptedProvider>, index: Arc<LiteratureIndex>, gate_open: bool) -> axum::Router {
    let credentials = if gate_open {
        Credentials::new().with(GATE, "tvly-test")
    } else {
        Credentials::new()
    };
    let tools = RegistryBuilder::new(credentials)
        .optional(DentalLiteratureTool::new(index, GATE))
        .build();

    let runtime = AgentRuntime::new(
        LoopSettings::default(),
        ProviderResolver::new()
            .with_default_provider("e2e")
            .with_provider_default_model("e2e", "e2e-model"),
        ProviderRouter::new()
            .with("e2e", provider.clone())
            .with("gemini", provider),
        Arc::new(tools),
        AssistantCatalog::builtin(),
    );
    build_router(GatewayState::new(runtime))
}

fn index() -> Arc<LiteratureIndex> {
    Arc::new(LiteratureIndex {
        queries: Mutex::new(Vec::new()),
    })
}

fn dental_request(token: Option<&str>) -> Request<Body> {
    let mut metadata = serde_json::json!({});
    if let Some(token) = token {
        metadata["x_auth"] = serde_json::json!(format!("Bearer {token}"));
    }
    let body = serde_json::json!({
        "assistant_id": "dental_agent",
        "input": { "messages": [{ "role": "user", "content": "Does fluoride varnish prevent caries in children?" }] },
        "metadata": metadata,
    });
    Request::builder()
        .method("POST")
        .uri("/runs/wait")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn e2e_dental_answer_with_citations() {
    let provider = ScriptedProvider::new(vec![
        tool_call(
            "search_dental_literature",
            serde_json::json!({ "query": "fluoride varnish children" }),
        ),
        Message::assistant("Yes. **Fluoride varnish** reduces caries in children [1][2]."),
    ]);
    let index = index();

    let response = app(provider.clone(), index.clone(), true)
        .oneshot(dental_request(Some("secret-token-123")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["iterations"], 2);
    assert_eq!(json["citations"].as_array().unwrap().len(), 2);
    assert_eq!(json["citations"][0]["marker"], "[1]");
    assert_eq!(json["citations"][0]["publication"], "Ada");
    assert_eq!(json["citations"][0]["year"], 2023);
    assert_eq!(json["citations"][1]["publication"], "Jada");
    assert_eq!(json["provider"]["provider"], "gemini");
    assert_eq!(json["provider"]["tier"], "pro");
    assert_eq!(json["usage"]["total_tokens"], 30);

    let queries = index.queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].contains("fluoride varnish children"));

    // The model saw numbered sources before answering; the token never reached it.
    let requests = provider.requests();
    let second = serde_json::to_string(&requests[1].messages).unwrap();
    assert!(second.contains("[1]"));
    assert!(!second.contains("secret-token-123"));
    assert!(!json.to_string().contains("secret-token-123"));
}

#[tokio::test]
async fn e2e_closed_gate_hides_tool_and_rejects_dental_runs() {
    let provider = ScriptedProvider::new(vec![Message::assistant("Use fluoride.")]);
    let index = index();
    let router = app(provider.clone(), index.clone(), false);

    let tools = router
        .clone()
        .oneshot(Request::builder().uri("/tools").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(json_body(tools).await["count"], 0);

    // The dental assistant cannot satisfy its guard without the evidence tool.
    let response = router.oneshot(dental_request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["kind"], "configuration_error");
    assert_eq!(json["iterations"], 0);

    assert!(provider.requests().is_empty());
    assert!(index.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn e2e_hidden_tool_call_is_corrected() {
    let provider = ScriptedProvider::new(vec![
        tool_call(
            "search_dental_literature",
            serde_json::json!({ "query": "fluoride" }),
        ),
        Message::assistant("I could not search the literature."),
    ]);
    let index = index();
    let body = serde_json::json!({
        "assistant_id": "react",
        "input": { "messages": [{ "role": "user", "content": "fluoride?" }] },
    });
    let response = app(provider.clone(), index.clone(), false)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/runs/wait")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let messages = serde_json::to_string(&json["messages"]).unwrap();
    assert!(messages.contains("unknown tool 'search_dental_literature'"));
    assert!(index.queries.lock().unwrap().is_empty());
    assert!(provider.requests()[0].tools.is_empty());
}

#[tokio::test]
async fn e2e_react_run_skips_guard() {
    let provider = ScriptedProvider::new(vec![Message::assistant("Hello there.")]);
    let body = serde_json::json!({
        "assistant_id": "react",
        "input": { "messages": [{ "role": "user", "content": "hi" }] },
    });
    let response = app(provider, index(), true)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/runs/wait")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["answer"], "Hello there.");
    assert_eq!(json["provider"]["provider"], "e2e");
    assert!(json["citations"].as_array().unwrap().is_empty());
}
