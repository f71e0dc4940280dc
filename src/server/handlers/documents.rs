use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Multipart, Path as UrlPath, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::state::AppState;

/// Collections created from uploads are named after their session id.
pub fn collection_for_session(session_id: &str) -> String {
    format!("document-{}", session_id)
}

/// Save the uploaded files, index them into a fresh collection and open a
/// research agent on it. The saved files are removed once indexing ends.
pub async fn upload_documents(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = Uuid::new_v4().to_string();
    let collection = collection_for_session(&session_id);
    let upload_dir = state.paths.upload_dir.join(&session_id);
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .map_err(ApiError::internal)?;

    let indexed = async {
        let files = save_uploads(&mut multipart, &upload_dir).await?;
        if files.is_empty() {
            return Err(ApiError::BadRequest("No files uploaded".to_string()));
        }
        state.open_agent(&collection, &files).await?;
        Ok(files)
    }
    .await;

    if let Err(err) = tokio::fs::remove_dir_all(&upload_dir).await {
        tracing::warn!("Failed to remove uploads in {}: {}", upload_dir.display(), err);
    }

    let files: Vec<String> = indexed?
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .collect();

    Ok(Json(json!({
        "id": session_id,
        "collection": collection,
        "files": files
    })))
}

async fn save_uploads(multipart: &mut Multipart, dir: &Path) -> Result<Vec<PathBuf>, ApiError> {
    let mut saved = Vec::new();
    let mut taken = HashSet::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("Invalid upload: {}", err)))?
    {
        let Some(file_name) = field.file_name().and_then(sanitize_file_name) else {
            continue;
        };
        let file_name = unique_file_name(&file_name, &mut taken);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::BadRequest(format!("Invalid upload: {}", err)))?;

        let path = dir.join(&file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(ApiError::internal)?;
        tracing::info!("Saved upload {} ({} bytes)", file_name, bytes.len());
        saved.push(path);
    }
    Ok(saved)
}

/// Keep only the final path component of a client-supplied name.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let normalized = raw.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .map(|name| name.to_string_lossy().trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Suffix repeated names (`a.md`, `a-1.md`, ...) so one upload never
/// overwrites another saved earlier in the same request.
fn unique_file_name(name: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());
    let extension = path.extension().map(|e| e.to_string_lossy().to_string());
    let mut n = 1;
    loop {
        let candidate = match &extension {
            Some(ext) => format!("{}-{}.{}", stem, n, ext),
            None => format!("{}-{}", stem, n),
        };
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

pub async fn list_collections(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let open = state.sessions.collections().await;
    let collections: Vec<_> = state
        .rag_store
        .list_collections()
        .await?
        .into_iter()
        .map(|name| {
            let is_open = open.contains(&name);
            json!({ "name": name, "open": is_open })
        })
        .collect();
    Ok(Json(json!({ "collections": collections })))
}

pub async fn open_collection(
    State(state): State<Arc<AppState>>,
    UrlPath(name): UrlPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = state.agent_for(&name).await?;
    Ok(Json(json!({
        "collection": agent.collection(),
        "status": "open"
    })))
}

pub async fn delete_collection(
    State(state): State<Arc<AppState>>,
    UrlPath(name): UrlPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let was_open = state.sessions.remove(&name).await;
    let deleted = state.rag_store.delete_collection(&name).await?;
    if !was_open && !deleted {
        return Err(ApiError::NotFound(format!("Collection {} not found", name)));
    }
    tracing::info!("Deleted collection {}", name);
    Ok(Json(json!({ "collection": name, "deleted": true })))
}
