use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest, ChatResponse, ToolCall, ToolDefinition};
use crate::core::errors::ApiError;

/// Client for OpenAI and OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.post(url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/models", self.base_url);
        let mut builder = self.client.get(&url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        match builder.send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<ChatResponse, ApiError> {
        let body = build_chat_body(&request, model_id);

        let res = self
            .post("/chat/completions")
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "chat completion failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        parse_chat_response(&payload)
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self
            .post("/embeddings")
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "embedding request failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let embeddings = parse_embeddings(&payload)?;
        if embeddings.len() != inputs.len() {
            return Err(ApiError::Upstream(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }
}

fn build_chat_body(request: &ChatRequest, model_id: &str) -> Value {
    let messages: Vec<Value> = request.messages.iter().map(wire_message).collect();

    let mut body = json!({
        "model": model_id,
        "messages": messages,
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(t) = request.temperature {
            obj.insert("temperature".to_string(), json!(t));
        }
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request.tools.iter().map(wire_tool).collect();
            obj.insert("tools".to_string(), Value::Array(tools));
            obj.insert("tool_choice".to_string(), json!("auto"));
        }
    }

    body
}

fn wire_message(message: &ChatMessage) -> Value {
    let mut value = json!({
        "role": message.role,
        "content": message.content,
    });
    if let Some(obj) = value.as_object_mut() {
        if !message.tool_calls.is_empty() {
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": { "name": call.name, "arguments": call.arguments },
                    })
                })
                .collect();
            obj.insert("tool_calls".to_string(), Value::Array(calls));
        }
        if let Some(id) = &message.tool_call_id {
            obj.insert("tool_call_id".to_string(), json!(id));
        }
    }
    value
}

fn wire_tool(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

fn parse_chat_response(payload: &Value) -> Result<ChatResponse, ApiError> {
    let message = payload
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| ApiError::Upstream("chat completion returned no choices".to_string()))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    let function = call.get("function")?;
                    Some(ToolCall {
                        id: call.get("id").and_then(Value::as_str)?.to_string(),
                        name: function.get("name").and_then(Value::as_str)?.to_string(),
                        arguments: function
                            .get("arguments")
                            .and_then(Value::as_str)
                            .unwrap_or("{}")
                            .to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        content,
        tool_calls,
    })
}

fn parse_embeddings(payload: &Value) -> Result<Vec<Vec<f32>>, ApiError> {
    let data = payload
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Upstream("embedding response has no data".to_string()))?;

    let mut indexed: Vec<(u64, Vec<f32>)> = data
        .iter()
        .enumerate()
        .filter_map(|(position, item)| {
            let vals = item.get("embedding")?.as_array()?;
            let index = item
                .get("index")
                .and_then(Value::as_u64)
                .unwrap_or(position as u64);
            let vector: Vec<f32> = vals
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            Some((index, vector))
        })
        .collect();

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}

#[cfg(test)]
mod tests {
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};

    use super::*;

    /// Serves `app` on an ephemeral port and returns its `/v1` base URL.
    async fn serve_fake(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    fn provider(base_url: String) -> OpenAiProvider {
        OpenAiProvider::new(base_url, Some("sk-test".to_string()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn chat_body_includes_tools_and_tool_messages() {
        let request = ChatRequest::new(vec![
            ChatMessage::user("What was the budget?"),
            ChatMessage::assistant_tool_calls(
                "",
                vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "document_retrieval_tool".to_string(),
                    arguments: r#"{"input":"budget"}"#.to_string(),
                }],
            ),
            ChatMessage::tool_result("call_1", "$776 million"),
        ])
        .with_tools(vec![ToolDefinition {
            name: "document_retrieval_tool".to_string(),
            description: "docs".to_string(),
            parameters: json!({"type": "object"}),
        }])
        .with_temperature(0.01);

        let body = build_chat_body(&request, "gpt-4o-mini");

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], 0.01);
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["function"]["name"], "document_retrieval_tool");
        assert_eq!(
            body["messages"][1]["tool_calls"][0]["function"]["arguments"],
            r#"{"input":"budget"}"#
        );
        assert_eq!(body["messages"][2]["tool_call_id"], "call_1");
        assert!(body["messages"][0].get("tool_calls").is_none());
    }

    #[test]
    fn chat_body_omits_tools_when_none() {
        let body = build_chat_body(&ChatRequest::new(vec![ChatMessage::user("hi")]), "m");
        assert!(body.get("tools").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn parses_text_and_tool_call_responses() {
        let text = parse_chat_response(&json!({
            "choices": [{ "message": { "role": "assistant", "content": "OKAY" } }]
        }))
        .unwrap();
        assert_eq!(text, ChatResponse::text("OKAY"));

        let calls = parse_chat_response(&json!({
            "choices": [{ "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_9",
                    "type": "function",
                    "function": { "name": "document_retrieval_tool", "arguments": "{\"input\":\"x\"}" }
                }]
            }}]
        }))
        .unwrap();
        assert_eq!(calls.content, "");
        assert_eq!(calls.tool_calls.len(), 1);
        assert_eq!(calls.tool_calls[0].id, "call_9");

        assert!(parse_chat_response(&json!({ "choices": [] })).is_err());
    }

    #[test]
    fn embeddings_are_ordered_by_index() {
        let vectors = parse_embeddings(&json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        }))
        .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn chat_posts_completions_and_reads_tool_calls() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let authorized = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    == Some("Bearer sk-test");
                if !authorized || body["model"] != "gpt-4o-mini" || body["tools"].is_null() {
                    return (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad request" })));
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "choices": [{ "message": {
                            "role": "assistant",
                            "content": null,
                            "tool_calls": [{
                                "id": "call_1",
                                "type": "function",
                                "function": {
                                    "name": "document_retrieval_tool",
                                    "arguments": "{\"input\":\"budget\"}"
                                }
                            }]
                        }}]
                    })),
                )
            }),
        );
        let provider = provider(serve_fake(app).await);

        let request = ChatRequest::new(vec![ChatMessage::user("What was the budget?")])
            .with_tools(vec![ToolDefinition {
                name: "document_retrieval_tool".to_string(),
                description: "docs".to_string(),
                parameters: json!({"type": "object"}),
            }]);
        let response = provider.chat(request, "gpt-4o-mini").await.unwrap();

        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "document_retrieval_tool");
        assert_eq!(response.tool_calls[0].arguments, r#"{"input":"budget"}"#);
    }

    #[tokio::test]
    async fn error_status_becomes_upstream_with_body() {
        let app = Router::new()
            .route(
                "/v1/chat/completions",
                post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") }),
            )
            .route(
                "/v1/embeddings",
                post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
            );
        let provider = provider(serve_fake(app).await);

        let err = provider
            .chat(ChatRequest::new(vec![ChatMessage::user("hi")]), "m")
            .await
            .unwrap_err();
        match err {
            ApiError::Upstream(msg) => {
                assert!(msg.contains("429"), "{msg}");
                assert!(msg.contains("rate limited"), "{msg}");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = provider.embed(&["a".to_string()], "e").await.unwrap_err();
        match err {
            ApiError::Upstream(msg) => assert!(msg.contains("invalid api key"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn embed_restores_input_order_and_checks_count() {
        let app = Router::new().route(
            "/v1/embeddings",
            post(|Json(body): Json<Value>| async move {
                let inputs = body["input"].as_array().map(Vec::len).unwrap_or(0);
                let data = if inputs == 2 {
                    json!([
                        { "index": 1, "embedding": [0.0, 1.0] },
                        { "index": 0, "embedding": [1.0, 0.0] }
                    ])
                } else {
                    json!([{ "index": 0, "embedding": [1.0, 0.0] }])
                };
                Json(json!({ "data": data }))
            }),
        );
        let provider = provider(serve_fake(app).await);

        let vectors = provider
            .embed(&["first".to_string(), "second".to_string()], "e")
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);

        let inputs: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let err = provider.embed(&inputs, "e").await.unwrap_err();
        assert!(matches!(err, ApiError::Upstream(ref msg) if msg.contains("expected 3 embeddings, got 1")));
    }

    #[tokio::test]
    async fn health_check_reaches_models_endpoint() {
        let app = Router::new().route("/v1/models", get(|| async { Json(json!({ "data": [] })) }));
        assert!(provider(serve_fake(app).await).health_check().await.unwrap());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let closed = format!("http://{}/v1", listener.local_addr().unwrap());
        drop(listener);
        assert!(!provider(closed).health_check().await.unwrap());
    }
}
