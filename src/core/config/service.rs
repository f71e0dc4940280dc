use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "access_key",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["max_tokens", "tokens", "max_tool_calls"];

/// Environment variables layered over the YAML files, as
/// (variable, section, key).
const ENV_OVERRIDES: [(&str, &str, &str); 7] = [
    ("OPENAI_API_KEY", "llm", "api_key"),
    ("OPENAI_BASE_URL", "llm", "base_url"),
    ("QDRANT_URL", "vector_store", "url"),
    ("QDRANT_API_KEY", "vector_store", "api_key"),
    ("LLAMA_CLOUD_API_KEY", "parser", "api_key"),
    ("DOCRESEARCH_HOST", "server", "host"),
    ("PORT", "server", "port"),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("DOCRESEARCH_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Merged `config.yml` + `secrets.yaml` + environment, validated.
    pub fn load_config(&self) -> Result<Value, ApiError> {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        let merged = deep_merge(&public_config, &secrets_config);
        let merged = apply_env_overrides(merged, |name| env::var(name).ok());
        validate_config(&merged)?;
        Ok(merged)
    }

    pub fn settings(&self) -> Result<AppConfig, ApiError> {
        let value = self.load_config()?;
        serde_json::from_value(value)
            .map_err(|err| ApiError::BadRequest(format!("Invalid config: {}", err)))
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Ignoring unparsable config {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn apply_env_overrides<F>(mut config: Value, lookup: F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    let Some(root) = config.as_object_mut() else {
        return config;
    };

    for (var, section, key) in ENV_OVERRIDES {
        let Some(raw) = lookup(var).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let value = if key == "port" {
            match raw.trim().parse::<u64>() {
                Ok(port) => Value::from(port),
                Err(_) => {
                    tracing::warn!("Ignoring non-numeric {}={}", var, raw);
                    continue;
                }
            }
        } else {
            Value::String(raw)
        };

        let entry = root
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(section_map) = entry.as_object_mut() {
            section_map.insert(key.to_string(), value);
        }
    }

    config
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "llm": { "model": "gpt-4o-mini", "temperature": 0.01 },
            "arr": [1, 2]
        });
        let override_value = json!({
            "llm": { "api_key": "sk-test" },
            "arr": [3]
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "llm": { "model": "gpt-4o-mini", "temperature": 0.01, "api_key": "sk-test" },
                "arr": [3]
            })
        );
    }

    #[test]
    fn env_overrides_fill_sections() {
        let config = json!({ "llm": { "model": "gpt-4o" } });
        let overridden = apply_env_overrides(config, |name| match name {
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            "QDRANT_URL" => Some("http://qdrant:6334".to_string()),
            "PORT" => Some("9000".to_string()),
            _ => None,
        });

        assert_eq!(overridden["llm"]["model"], "gpt-4o");
        assert_eq!(overridden["llm"]["api_key"], "sk-env");
        assert_eq!(overridden["vector_store"]["url"], "http://qdrant:6334");
        assert_eq!(overridden["server"]["port"], 9000);
    }

    #[test]
    fn env_overrides_skip_bad_port_and_blank_values() {
        let overridden = apply_env_overrides(json!({}), |name| match name {
            "PORT" => Some("eighty".to_string()),
            "OPENAI_API_KEY" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(overridden, json!({}));
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "llm": { "api_key": "secret", "model": "gpt-4o-mini" },
            "workflow": { "max_tool_calls": 5 },
            "items": [ { "password": "pw" } ]
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "llm": { "api_key": "****", "model": "gpt-4o-mini" },
                "workflow": { "max_tool_calls": 5 },
                "items": [ { "password": "****" } ]
            })
        );
    }

    #[test]
    fn settings_merge_config_and_secrets_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::from_dirs(dir.path().to_path_buf(), dir.path().join("data"));
        fs::write(
            paths.user_data_dir.join("config.yml"),
            "workflow:\n  similarity_top_k: 5\nvector_store:\n  backend: memory\n",
        )
        .unwrap();
        fs::write(&paths.secrets_path, "parser:\n  api_key: llx-secret\n").unwrap();

        let service = ConfigService::new(Arc::new(paths));
        let public = load_yaml_file(&service.config_path());
        let secrets = load_yaml_file(&service.secrets_path());
        let merged = deep_merge(&public, &secrets);
        let settings: AppConfig = serde_json::from_value(merged).unwrap();

        assert_eq!(settings.workflow.similarity_top_k, 5);
        assert_eq!(settings.parser.api_key.as_deref(), Some("llx-secret"));
    }
}
