use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use docresearch_backend::server;
use docresearch_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(path) = dotenvy::dotenv() {
        eprintln!("Loaded environment from {}", path.display());
    }

    let state = AppState::initialize().await?;
    docresearch_backend::core::logging::init(&state.paths);

    let bind_addr = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.port
    );
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("DOCRESEARCH_ADDR=http://{}", addr);
    tracing::info!(
        "Listening on {} (model {}, vector store {})",
        addr,
        state.llm.model(),
        state.rag_store.name()
    );

    let app: Router = server::router::router(state.clone());

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
