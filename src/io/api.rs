use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::model::config::ApiConfig;
use crate::model::task::{Task, TaskPayload};

const UNKNOWN_ERROR: &str = "An unknown error occurred";

/// Normalized failure of a task store request.
///
/// Every transport failure, non-2xx response and undecodable body ends up
/// here. `status` is 500 when nothing better is known.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

/// Error body shape returned by the task store
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    /// Build from a non-2xx response. The body's `message` wins, then the
    /// status line.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Request failed with status code {}", status));
        ApiError { status, message }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16()).unwrap_or(500);
        let message = err.to_string();
        ApiError {
            status,
            message: if message.is_empty() {
                UNKNOWN_ERROR.to_string()
            } else {
                message
            },
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::new(500, format!("malformed response body: {}", err))
    }
}

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// The remote `/tasks` resource
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// `GET /tasks`
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError>;
    /// `GET /tasks/{id}`
    async fn get_task(&self, id: &str) -> Result<Task, ApiError>;
    /// `POST /tasks`
    async fn create_task(&self, payload: &TaskPayload) -> Result<Task, ApiError>;
    /// `PUT /tasks/{id}`
    async fn update_task(&self, id: &str, payload: &TaskPayload) -> Result<Task, ApiError>;
    /// `DELETE /tasks/{id}`
    async fn delete_task(&self, id: &str) -> Result<(), ApiError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// JSON-over-HTTP task store client
#[derive(Debug, Clone)]
pub struct HttpTaskStore {
    base_url: Url,
    client: Client,
}

impl HttpTaskStore {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ApiError::new(500, format!("invalid base URL '{}': {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::new(
                500,
                format!("invalid base URL '{}'", config.base_url),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(HttpTaskStore { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/tasks` or `{base}/tasks/{id}`, with the id percent-encoded
    fn endpoint(&self, id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("tasks");
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }

    fn request(&self, method: Method, id: Option<&str>) -> RequestBuilder {
        let url = self.endpoint(id);
        debug!(%method, %url, "task store request");
        self.client
            .request(method, url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
    }

    /// Send and return the raw body of a 2xx response.
    async fn send(&self, req: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let err = ApiError::from_response(status.as_u16(), &body);
            debug!(status = err.status, message = %err.message, "task store error response");
            return Err(err);
        }
        Ok(body.to_vec())
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(req).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl TaskStore for HttpTaskStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.send_json(self.request(Method::GET, None)).await
    }

    async fn get_task(&self, id: &str) -> Result<Task, ApiError> {
        self.send_json(self.request(Method::GET, Some(id))).await
    }

    async fn create_task(&self, payload: &TaskPayload) -> Result<Task, ApiError> {
        self.send_json(self.request(Method::POST, None).json(payload))
            .await
    }

    async fn update_task(&self, id: &str, payload: &TaskPayload) -> Result<Task, ApiError> {
        self.send_json(self.request(Method::PUT, Some(id)).json(payload))
            .await
    }

    async fn delete_task(&self, id: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, Some(id))).await?;
        Ok(())
    }
}
