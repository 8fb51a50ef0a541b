// crates/tasks/src/client.rs
//! Job service client.
//!
//! The API server runs long operations as background jobs:
//! - `<route>` — start a job, returns its id
//! - `/tasks/{id}/ready` — readiness flag
//! - `/tasks/{id}/result` — [`TaskResult`] payload once ready

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use skyview_core::{JobId, TaskResult};

use crate::error::JobServiceError;

/// Longest slice of an error body kept in [`JobServiceError::Status`].
const MAX_ERROR_BODY: usize = 500;

/// Overrides for the submission request.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub method: Method,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
}

impl Default for SubmitRequest {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: Vec::new(),
        }
    }
}

impl SubmitRequest {
    pub fn post(body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Backend that runs jobs and reports on them.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Start the job behind `route` and return its id.
    async fn submit(&self, route: &str, request: &SubmitRequest) -> Result<JobId, JobServiceError>;

    async fn is_ready(&self, id: &JobId) -> Result<bool, JobServiceError>;

    async fn result(&self, id: &JobId) -> Result<TaskResult<serde_json::Value>, JobServiceError>;
}

/// [`JobService`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpJobService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpJobService {
    pub fn new(base_url: impl Into<String>) -> Result<Self, JobServiceError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Client with a per-request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, JobServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Resolve `route` against the base URL. Absolute URLs pass through.
    pub fn url_for(&self, route: &str) -> String {
        if route.starts_with("http://") || route.starts_with("https://") {
            return route.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<String, JobServiceError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let mut end = body.len().min(MAX_ERROR_BODY);
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            return Err(JobServiceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body: body[..end].to_string(),
            });
        }
        Ok(body)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, JobServiceError> {
        let body = self.send(self.client.get(url), url).await?;
        serde_json::from_str(&body).map_err(|e| JobServiceError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Job ids come back as a JSON string or as bare text.
fn parse_job_id(body: &str, url: &str) -> Result<JobId, JobServiceError> {
    let trimmed = body.trim();
    let id = serde_json::from_str::<String>(trimmed).unwrap_or_else(|_| trimmed.to_string());
    if id.trim().is_empty() {
        return Err(JobServiceError::Decode {
            url: url.to_string(),
            message: "empty job id".into(),
        });
    }
    Ok(JobId::new(id))
}

#[async_trait]
impl JobService for HttpJobService {
    async fn submit(&self, route: &str, request: &SubmitRequest) -> Result<JobId, JobServiceError> {
        let url = self.url_for(route);
        let mut builder = self.client.request(request.method.clone(), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(%url, method = %request.method, "submitting job");
        let body = self.send(builder, &url).await?;
        parse_job_id(&body, &url)
    }

    async fn is_ready(&self, id: &JobId) -> Result<bool, JobServiceError> {
        let url = self.url_for(&format!("/tasks/{id}/ready"));
        self.get_json(&url).await
    }

    async fn result(&self, id: &JobId) -> Result<TaskResult<serde_json::Value>, JobServiceError> {
        let url = self.url_for(&format!("/tasks/{id}/result"));
        self.get_json(&url).await
    }
}
