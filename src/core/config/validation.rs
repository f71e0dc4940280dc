use serde_json::{Map, Value};

use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_optional_string_field(llm, "llm.model", "model")?;
        validate_optional_string_field(llm, "llm.embedding_model", "embedding_model")?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(
            llm,
            "llm.request_timeout_secs",
            "request_timeout_secs",
            1,
            86_400,
        )?;
    }

    if let Some(store) = expect_optional_object(root, "vector_store")? {
        validate_enum_field(
            store,
            "vector_store.backend",
            "backend",
            &["qdrant", "memory"],
        )?;
        validate_optional_string_field(store, "vector_store.url", "url")?;
        validate_optional_string_field(store, "vector_store.api_key", "api_key")?;
    }

    if let Some(parser) = expect_optional_object(root, "parser")? {
        validate_optional_string_field(parser, "parser.base_url", "base_url")?;
        validate_optional_string_field(parser, "parser.api_key", "api_key")?;
        validate_enum_field(
            parser,
            "parser.result_type",
            "result_type",
            &["markdown", "text"],
        )?;
        validate_u64_field(
            parser,
            "parser.poll_interval_ms",
            "poll_interval_ms",
            10,
            60_000,
        )?;
        validate_u64_field(parser, "parser.max_wait_secs", "max_wait_secs", 1, 86_400)?;
    }

    if let Some(ingest) = expect_optional_object(root, "ingest")? {
        validate_u64_field(ingest, "ingest.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(ingest, "ingest.chunk_overlap", "chunk_overlap", 0, 1_000_000)?;
        validate_u64_field(
            ingest,
            "ingest.embed_batch_size",
            "embed_batch_size",
            1,
            2048,
        )?;

        let size = ingest.get("chunk_size").and_then(Value::as_u64);
        let overlap = ingest.get("chunk_overlap").and_then(Value::as_u64);
        if let (Some(size), Some(overlap)) = (size, overlap) {
            if overlap >= size {
                return Err(ApiError::BadRequest(
                    "Invalid config at 'ingest.chunk_overlap': must be smaller than chunk_size"
                        .to_string(),
                ));
            }
        }
    }

    if let Some(workflow) = expect_optional_object(root, "workflow")? {
        validate_u64_field(
            workflow,
            "workflow.similarity_top_k",
            "similarity_top_k",
            1,
            1000,
        )?;
        validate_u64_field(workflow, "workflow.timeout_secs", "timeout_secs", 1, 86_400)?;
        validate_u64_field(workflow, "workflow.max_questions", "max_questions", 1, 100)?;
        validate_u64_field(
            workflow,
            "workflow.max_review_questions",
            "max_review_questions",
            1,
            100,
        )?;
        validate_u64_field(workflow, "workflow.max_reviews", "max_reviews", 1, 20)?;
        validate_u64_field(
            workflow,
            "workflow.answer_concurrency",
            "answer_concurrency",
            1,
            64,
        )?;
        validate_u64_field(workflow, "workflow.max_tool_calls", "max_tool_calls", 1, 50)?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
        validate_u64_field(server, "server.max_upload_mb", "max_upload_mb", 1, 4096)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if allowed.contains(&text) {
        return Ok(());
    }
    Err(ApiError::BadRequest(format!(
        "Invalid config at '{}': expected one of {}",
        path,
        allowed.join(", ")
    )))
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_and_typical_configs() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({
            "llm": { "model": "gpt-4o-mini", "temperature": 0.01, "api_key": null },
            "vector_store": { "backend": "qdrant", "url": "http://localhost:6334" },
            "ingest": { "chunk_size": 1000, "chunk_overlap": 100 },
            "workflow": { "similarity_top_k": 10, "max_reviews": 2 },
            "server": { "port": 8501 }
        }))
        .is_ok());
    }

    #[test]
    fn rejects_wrong_types_and_ranges() {
        let err = validate_config(&json!({ "llm": "gpt" })).unwrap_err();
        assert!(err.to_string().contains("'llm': expected object"));

        let err = validate_config(&json!({ "llm": { "temperature": 3.5 } })).unwrap_err();
        assert!(err.to_string().contains("llm.temperature"));

        let err = validate_config(&json!({ "workflow": { "similarity_top_k": 0 } })).unwrap_err();
        assert!(err.to_string().contains("workflow.similarity_top_k"));

        let err = validate_config(&json!({ "vector_store": { "backend": "chroma" } })).unwrap_err();
        assert!(err.to_string().contains("qdrant, memory"));
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk() {
        let err = validate_config(&json!({
            "ingest": { "chunk_size": 100, "chunk_overlap": 100 }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }
}
