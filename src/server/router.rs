use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{config, documents, health, research, ui};
use crate::server::ws::handler::ws_handler;
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
///
/// This function sets up:
/// - CORS middleware and the upload size limit
/// - The single-page UI and health endpoints
/// - Document, collection and research endpoints
/// - WebSocket progress streaming
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state);
    let body_limit = state.settings.server.max_upload_mb * 1024 * 1024;
    Router::new()
        .route("/", get(ui::index))
        .route("/health", get(health::health))
        .route("/api/status", get(health::get_status))
        .route("/api/config", get(config::get_config))
        .route("/api/documents", post(documents::upload_documents))
        .route("/api/collections", get(documents::list_collections))
        .route(
            "/api/collections/:name/open",
            post(documents::open_collection),
        )
        .route(
            "/api/collections/:name",
            delete(documents::delete_collection),
        )
        .route("/api/research", post(research::run_research))
        .route("/ws", get(ws_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(state: &Arc<AppState>) -> CorsLayer {
    let configured = resolve_allowed_origins(&state.settings.server.cors_allowed_origins);
    let port = state.settings.server.port;
    let origins = if configured.is_empty() {
        default_local_origins(port)
    } else {
        configured
    };

    let allow_origin = AllowOrigin::list(
        origins
            .into_iter()
            .filter_map(|origin| HeaderValue::from_str(&origin).ok())
            .collect::<Vec<_>>(),
    );

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    configured
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect()
}

fn default_local_origins(port: u16) -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        format!("http://localhost:{}", port),
        "http://127.0.0.1".to_string(),
        format!("http://127.0.0.1:{}", port),
    ]
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use axum::body::{to_bytes, Body};
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::core::config::{AppConfig, AppPaths, ConfigService};
    use crate::ingest::{PlainTextParser, RoutingParser};
    use crate::llm::{ChatRequest, ChatResponse};
    use crate::rag::InMemoryRagStore;
    use crate::test_support::{scripted_service, ScriptedLlm};

    const BOUNDARY: &str = "docresearch-boundary";

    fn reply_for(request: &ChatRequest) -> Result<ChatResponse, crate::core::errors::ApiError> {
        let first = request.messages[0].content.as_str();
        let reply = if first.contains("Plan an outline") {
            "1. Budget"
        } else if first.contains("formulating research questions") {
            "What was the budget?"
        } else if first.contains("Compose the blog post") {
            "The budget was 776 million dollars."
        } else if first.contains("expert reviewer") {
            "OKAY"
        } else {
            "776 million dollars"
        };
        Ok(ChatResponse::text(reply))
    }

    fn test_state(dir: &TempDir) -> Arc<AppState> {
        let root: PathBuf = dir.path().to_path_buf();
        let paths = Arc::new(AppPaths::from_dirs(root.clone(), root.join("data")));
        let config = ConfigService::new(paths.clone());
        let parser = Arc::new(RoutingParser::new(Arc::new(PlainTextParser), None));
        Arc::new(AppState::with_services(
            paths,
            config,
            AppConfig::default(),
            scripted_service(Arc::new(ScriptedLlm::with_handler(reply_for))),
            Arc::new(InMemoryRagStore::new()),
            parser,
        ))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn upload_request(file_name: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/markdown\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/api/documents")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn health_and_ui_are_served() {
        let dir = TempDir::new().unwrap();
        let app = router(test_state(&dir));

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");

        let response = app.oneshot(empty_request("GET", "/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("San Francisco Police Department in 2023"));
    }

    #[tokio::test]
    async fn status_reports_backends() {
        let dir = TempDir::new().unwrap();
        let response = router(test_state(&dir))
            .oneshot(empty_request("GET", "/api/status"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["vector_store"]["backend"], "memory");
        assert_eq!(body["vector_store"]["reachable"], true);
        assert_eq!(body["open_sessions"], 0);
    }

    #[tokio::test]
    async fn config_is_served_redacted() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(
            dir.path().join("data").join("secrets.yaml"),
            "llm:\n  api_key: sk-secret\n",
        )
        .unwrap();
        let response = router(test_state(&dir))
            .oneshot(empty_request("GET", "/api/config"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_ne!(body["llm"]["api_key"], "sk-secret");
    }

    #[tokio::test]
    async fn research_on_unknown_collection_is_not_found() {
        let dir = TempDir::new().unwrap();
        let response = router(test_state(&dir))
            .oneshot(json_request(
                "POST",
                "/api/research",
                json!({"collection": "document-missing", "query": "budget"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("document-missing"));
    }

    #[tokio::test]
    async fn upload_research_and_delete() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(upload_request(
                "sfpd.md",
                "The police budget in 2023 was 776 million dollars.",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let collection = body["collection"].as_str().unwrap().to_string();
        assert_eq!(collection, format!("document-{}", body["id"].as_str().unwrap()));
        assert_eq!(body["files"], json!(["sfpd.md"]));

        // Uploaded files do not outlive indexing.
        let leftovers = std::fs::read_dir(&state.paths.upload_dir).unwrap().count();
        assert_eq!(leftovers, 0);

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/api/collections"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(
            body["collections"],
            json!([{"name": collection.clone(), "open": true}])
        );

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/research",
                json!({"collection": collection.clone(), "query": "SFPD budget"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["report"],
            "The budget was 776 million dollars."
        );

        let uri = format!("/api/collections/{}", collection);
        let response = app
            .clone()
            .oneshot(empty_request("DELETE", &uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(empty_request("DELETE", &uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn repeated_file_names_are_all_indexed() {
        let dir = TempDir::new().unwrap();
        let part = |content: &str| {
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"files\"; filename=\"sfpd.md\"\r\n\
                 Content-Type: text/markdown\r\n\r\n\
                 {content}\r\n"
            )
        };
        let body = format!(
            "{}{}--{BOUNDARY}--\r\n",
            part("The police budget in 2023 was 776 million dollars."),
            part("Overtime spending grew in 2023.")
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/documents")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = router(test_state(&dir)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["files"],
            json!(["sfpd.md", "sfpd-1.md"])
        );
    }

    #[tokio::test]
    async fn upload_without_files_is_rejected() {
        let dir = TempDir::new().unwrap();
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/documents")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = router(test_state(&dir)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    async fn serve(state: Arc<AppState>) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        addr
    }

    /// Sends one text frame and collects replies up to `done` or `error`.
    async fn ws_exchange(addr: std::net::SocketAddr, text: &str) -> Vec<Value> {
        let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
            .await
            .unwrap();
        socket.send(Message::text(text)).await.unwrap();

        let mut replies = Vec::new();
        while let Some(frame) = socket.next().await {
            let frame = frame.unwrap();
            if !frame.is_text() {
                continue;
            }
            let reply: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
            let kind = reply["type"].as_str().unwrap_or("").to_string();
            replies.push(reply);
            if kind == "done" || kind == "error" {
                break;
            }
        }
        replies
    }

    #[tokio::test]
    async fn websocket_run_streams_progress_then_result() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);
        let doc = dir.path().join("sfpd.md");
        std::fs::write(&doc, "The police budget in 2023 was 776 million dollars.").unwrap();
        state.open_agent("document-ws", &[doc]).await.unwrap();
        let addr = serve(state).await;

        let replies = ws_exchange(
            addr,
            &json!({"type": "run", "collection": "document-ws", "query": "SFPD budget"})
                .to_string(),
        )
        .await;

        let kinds: Vec<&str> = replies
            .iter()
            .map(|r| r["type"].as_str().unwrap())
            .collect();
        assert!(kinds.len() > 2);
        assert!(kinds[..kinds.len() - 2].iter().all(|k| *k == "progress"));
        assert_eq!(kinds[kinds.len() - 2..], ["result", "done"]);
        assert_eq!(replies[0]["progress"], "Outline:\n1. Budget");
        assert_eq!(
            replies[kinds.len() - 2]["report"],
            "The budget was 776 million dollars."
        );
    }

    #[tokio::test]
    async fn websocket_reports_request_errors() {
        let dir = TempDir::new().unwrap();
        let addr = serve(test_state(&dir)).await;

        let replies = ws_exchange(
            addr,
            &json!({"type": "run", "collection": "document-missing", "query": "budget"})
                .to_string(),
        )
        .await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["type"], "error");
        assert!(replies[0]["message"]
            .as_str()
            .unwrap()
            .contains("document-missing not found"));

        let replies = ws_exchange(addr, "{not json").await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["type"], "error");
        assert!(replies[0]["message"]
            .as_str()
            .unwrap()
            .contains("Invalid message"));
    }

    #[test]
    fn configured_origins_replace_local_defaults() {
        assert!(resolve_allowed_origins(&["  ".to_string()]).is_empty());
        assert_eq!(
            resolve_allowed_origins(&[" https://research.example ".to_string()]),
            vec!["https://research.example"]
        );
        assert!(default_local_origins(8501).contains(&"http://localhost:8501".to_string()));
    }
}
