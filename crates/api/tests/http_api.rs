use async_trait::async_trait;
use axum::body::to_bytes;
use axum::http::{Request, StatusCode};
use memagent_agent::tools::{MathTool, Operation};
use memagent_agent::{MemoryAgent, ToolRegistry};
use memagent_api::{router, AppState};
use memagent_config::Config;
use memagent_provider::{ChatParams, ChatResponse, Provider, ProviderError, ToolCall, ROLE_TOOL};
use memagent_session::MemoryStore;
use mockall::mock;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

/// Scripted model: asks for a tool when the user names an operation,
/// otherwise echoes the last tool result.
fn scripted_model() -> MockProvider {
    let mut mock = MockProvider::new();
    mock.expect_chat().returning(|params| {
        let last = params.messages.last().cloned();
        let Some(last) = last else {
            return Ok(ChatResponse::text("nothing to do"));
        };

        if last.is_role(ROLE_TOOL) {
            return Ok(ChatResponse::text(format!("The result is {}", last.text())));
        }

        let text = last.text().to_lowercase();
        let tool = if text.starts_with("suma") {
            Some(("add", 15, 25))
        } else if text.starts_with("divide") {
            Some(("divide", 10, 0))
        } else {
            None
        };
        match tool {
            Some((name, a, b)) => Ok(ChatResponse::tool_calls(vec![ToolCall {
                id: "call_1".to_string(),
                name: name.to_string(),
                arguments: json!({"a": a, "b": b}),
            }])),
            None => Ok(ChatResponse::text(format!(
                "I have seen {} messages",
                params.messages.len()
            ))),
        }
    });
    mock
}

fn ready_app(mock: MockProvider) -> axum::Router {
    let agent = MemoryAgent::new(mock, Arc::new(MemoryStore::new()), &Config::default());
    router(AppState::with_agent(Arc::new(agent)))
}

async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(text) => {
            builder = builder.header("content-type", "application/json");
            axum::body::Body::from(text.to_string())
        }
        None => axum::body::Body::empty(),
    };

    let resp = app
        .oneshot(builder.body(body).expect("request build should succeed"))
        .await
        .expect("app should handle request");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("response body should be readable");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn post_chat(app: axum::Router, payload: Value) -> (StatusCode, Value) {
    send(app, "POST", "/chat", Some(&payload.to_string())).await
}

#[tokio::test]
async fn test_root_before_ready() {
    let app = router(AppState::new());
    let (status, body) = send(app, "GET", "/", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["agent_ready"], false);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_health_503_before_ready() {
    let app = router(AppState::new());
    let (status, body) = send(app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["detail"], "Agent is not initialized");
}

#[tokio::test]
async fn test_health_ready() {
    let app = ready_app(MockProvider::new());
    let (status, body) = send(app.clone(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent_ready"], true);

    let (_, body) = send(app, "GET", "/", None).await;
    assert_eq!(body["agent_ready"], true);
}

#[tokio::test]
async fn test_readiness_flips_when_agent_installed() {
    let state = AppState::new();
    let app = router(state.clone());
    let (status, _) = send(app.clone(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let agent = MemoryAgent::new(
        MockProvider::new(),
        Arc::new(MemoryStore::new()),
        &Config::default(),
    );
    assert!(state.set_agent(Arc::new(agent)));

    let (status, _) = send(app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_agent_routes_503_before_ready() {
    let app = router(AppState::new());

    let (status, body) = post_chat(app.clone(), json!({"message": "hi"})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["detail"], "Agent is not available");

    let (status, _) = send(app.clone(), "GET", "/conversation/t", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(app, "DELETE", "/conversation/t", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_tools_available_before_ready() {
    let app = router(AppState::new());
    let (status, body) = send(app, "GET", "/tools", None).await;

    assert_eq!(status, StatusCode::OK);
    let tools = body["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 3);
    assert_eq!(tools[0]["name"], "add");
    assert_eq!(tools[0]["parameters"], json!(["a: int", "b: int"]));
    assert_eq!(tools[0]["returns"], "int");
    assert_eq!(tools[1]["name"], "multiply");
    assert_eq!(tools[2]["name"], "divide");
    assert_eq!(tools[2]["returns"], "float");
}

#[tokio::test]
async fn test_tools_follow_installed_agent() {
    let mut registry = ToolRegistry::new();
    registry.register(MathTool::new(Operation::Divide));
    let agent = MemoryAgent::new(
        MockProvider::new(),
        Arc::new(MemoryStore::new()),
        &Config::default(),
    )
    .with_tools(registry);
    let app = router(AppState::with_agent(Arc::new(agent)));

    let (status, body) = send(app, "GET", "/tools", None).await;
    assert_eq!(status, StatusCode::OK);
    let tools = body["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "divide");
}

#[tokio::test]
async fn test_chat_add_scenario() {
    let app = ready_app(scripted_model());
    let (status, body) = post_chat(
        app,
        json!({"message": "Suma 15 y 25", "thread_id": "t1"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["thread_id"], "t1");
    assert_eq!(
        body["tools_used"],
        json!([{"name": "add", "args": {"a": 15, "b": 25}}])
    );
    assert!(body["response"].as_str().unwrap().contains("40"));
    assert_eq!(body["message_count"], 4);
}

#[tokio::test]
async fn test_chat_divide_by_zero_is_not_500() {
    let app = ready_app(scripted_model());
    let (status, body) = post_chat(
        app,
        json!({"message": "Divide 10 entre 0", "thread_id": "t2"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["response"]
        .as_str()
        .unwrap()
        .contains("Cannot divide by zero"));
    assert_eq!(body["tools_used"][0]["name"], "divide");
}

#[tokio::test]
async fn test_chat_default_thread() {
    let app = ready_app(scripted_model());
    let (status, body) = post_chat(app, json!({"message": "hola"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["thread_id"], "default");
    assert_eq!(body["tools_used"], json!([]));
}

#[tokio::test]
async fn test_chat_validation_errors_are_422() {
    let app = ready_app(MockProvider::new());

    let cases = [
        json!({"message": ""}),
        json!({"thread_id": "t"}),
        json!({"message": 42}),
    ];
    for payload in cases {
        let (status, body) = post_chat(app.clone(), payload.clone()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "payload {}", payload);
        assert!(body["detail"].is_string());
    }

    let (status, _) = send(app, "POST", "/chat", Some("{not json")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_chat_upstream_failure_is_500() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .returning(|_| Err(ProviderError::RateLimited));
    let app = ready_app(mock);

    let (status, body) = post_chat(app, json!({"message": "Suma 1 y 2"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Error processing message: "));
    assert!(detail.contains("rate limited"));
}

#[tokio::test]
async fn test_conversation_memory_and_clear() {
    let app = ready_app(scripted_model());

    post_chat(app.clone(), json!({"message": "Suma 15 y 25", "thread_id": "mem"})).await;
    let (status, body) = post_chat(
        app.clone(),
        json!({"message": "What did I ask?", "thread_id": "mem"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // system + 4 stored + new question
    assert_eq!(body["response"], "I have seen 6 messages");
    assert_eq!(body["message_count"], 6);

    let (status, body) = send(app.clone(), "GET", "/conversation/mem", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["thread_id"], "mem");
    assert_eq!(body["message_count"], 6);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages[0], json!({"type": "human", "content": "Suma 15 y 25"}));
    assert_eq!(messages[1]["type"], "ai");
    assert_eq!(messages[1]["tool_calls"][0]["name"], "add");
    assert_eq!(messages[2]["type"], "tool");
    assert_eq!(messages[2]["content"], "40");

    let (status, body) = send(app.clone(), "DELETE", "/conversation/mem", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Conversation mem cleared successfully");

    let (_, body) = send(app, "GET", "/conversation/mem", None).await;
    assert_eq!(body["message_count"], 0);
    assert_eq!(body["messages"], json!([]));
}

#[tokio::test]
async fn test_threads_are_isolated() {
    let app = ready_app(scripted_model());
    post_chat(app.clone(), json!({"message": "Suma 15 y 25", "thread_id": "a"})).await;
    post_chat(app.clone(), json!({"message": "hola", "thread_id": "b"})).await;

    let (_, a) = send(app.clone(), "GET", "/conversation/a", None).await;
    let (_, b) = send(app, "GET", "/conversation/b", None).await;
    assert_eq!(a["message_count"], 4);
    assert_eq!(b["message_count"], 2);
    assert_eq!(b["messages"][0]["content"], "hola");
}

#[tokio::test]
async fn test_encoded_thread_id_in_path() {
    let app = ready_app(scripted_model());
    post_chat(app.clone(), json!({"message": "hola", "thread_id": "team a/b"})).await;

    let (status, body) = send(app.clone(), "GET", "/conversation/team%20a%2Fb", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["thread_id"], "team a/b");
    assert_eq!(body["message_count"], 2);

    let (status, _) = send(app.clone(), "DELETE", "/conversation/team%20a%2Fb", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(app, "GET", "/conversation/team%20a%2Fb", None).await;
    assert_eq!(body["message_count"], 0);
}

#[tokio::test]
async fn test_unknown_thread_and_delete_empty_thread() {
    let app = ready_app(MockProvider::new());

    let (status, body) = send(app.clone(), "GET", "/conversation/ghost", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message_count"], 0);

    let (status, _) = send(app, "DELETE", "/conversation/ghost", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cors_headers_present() {
    let app = ready_app(MockProvider::new());
    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/tools")
                .header("origin", "http://example.com")
                .body(axum::body::Body::empty())
                .expect("request build should succeed"),
        )
        .await
        .expect("app should handle request");

    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .map(|v| v.to_str().unwrap_or_default()),
        Some("*")
    );
}
