//! LlamaParse cloud client: upload, poll the job, fetch the result.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::Instant;

use super::parser::{file_name, DocumentParser, ParsedDocument};
use crate::core::config::ParserConfig;
use crate::core::errors::ApiError;

#[derive(Debug, Deserialize)]
struct JobResponse {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobStatus {
    Pending,
    Success,
    Failed,
}

impl JobStatus {
    fn parse(status: Option<&str>) -> Self {
        match status.map(|s| s.to_ascii_uppercase()).as_deref() {
            Some("SUCCESS") => JobStatus::Success,
            Some("ERROR") | Some("CANCELED") | Some("CANCELLED") => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }
}

pub struct LlamaParseClient {
    base_url: String,
    api_key: String,
    result_type: String,
    poll_interval: Duration,
    max_wait: Duration,
    client: Client,
}

impl LlamaParseClient {
    pub fn from_config(config: &ParserConfig) -> Result<Self, ApiError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ApiError::BadRequest("parser.api_key is not set".to_string()))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            result_type: config.result_type.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_wait: Duration::from_secs(config.max_wait_secs),
            client: Client::new(),
        })
    }

    async fn upload(&self, path: &Path) -> Result<String, ApiError> {
        let bytes = tokio::fs::read(path).await.map_err(|err| {
            ApiError::BadRequest(format!("Cannot read {}: {}", path.display(), err))
        })?;
        let part = Part::bytes(bytes)
            .file_name(file_name(path))
            .mime_str(mime_for(path))
            .map_err(ApiError::internal)?;
        let form = Form::new().part("file", part);

        let res = self
            .client
            .post(format!("{}/api/parsing/upload", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "document upload failed ({}): {}",
                status, text
            )));
        }

        let job: JobResponse = res.json().await.map_err(ApiError::upstream)?;
        Ok(job.id)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        let res = self
            .client
            .get(format!("{}/api/parsing/job/{}", self.base_url, job_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "parse job status failed: {}",
                res.status()
            )));
        }

        let job: JobResponse = res.json().await.map_err(ApiError::upstream)?;
        Ok(JobStatus::parse(job.status.as_deref()))
    }

    async fn wait_for_job(&self, job_id: &str, source: &str) -> Result<(), ApiError> {
        let started = Instant::now();
        loop {
            match self.job_status(job_id).await? {
                JobStatus::Success => return Ok(()),
                JobStatus::Failed => {
                    return Err(ApiError::Upstream(format!(
                        "parse job {} for {} failed",
                        job_id, source
                    )))
                }
                JobStatus::Pending => {}
            }

            if started.elapsed() >= self.max_wait {
                return Err(ApiError::Timeout(format!(
                    "parse job {} for {} did not finish within {}s",
                    job_id,
                    source,
                    self.max_wait.as_secs()
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn fetch_result(&self, job_id: &str) -> Result<String, ApiError> {
        let res = self
            .client
            .get(format!(
                "{}/api/parsing/job/{}/result/{}",
                self.base_url, job_id, self.result_type
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "parse result fetch failed: {}",
                res.status()
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        extract_result_text(&payload, &self.result_type)
    }
}

#[async_trait]
impl DocumentParser for LlamaParseClient {
    async fn parse(&self, path: &Path) -> Result<Vec<ParsedDocument>, ApiError> {
        let source = file_name(path);
        let job_id = self.upload(path).await?;
        tracing::info!("Parsing {} (job {})", source, job_id);

        self.wait_for_job(&job_id, &source).await?;
        let text = self.fetch_result(&job_id).await?;
        tracing::debug!("Parsed {} into {} chars", source, text.len());

        Ok(vec![ParsedDocument { text, source }])
    }
}

fn extract_result_text(payload: &Value, result_type: &str) -> Result<String, ApiError> {
    payload
        .get(result_type)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError::Upstream(format!("parse result is missing the '{}' field", result_type))
        })
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("pptx") => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }
        Some("html") | Some("htm") => "text/html",
        _ => "application/octet-stream",
    }
}
