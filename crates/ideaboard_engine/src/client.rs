use std::time::Duration;

use ideaboard_core::{proxy_url, stream_path, IdeaPage, IdeaSubmission, InvokeRequest, JobRecord};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;
use tracker_logging::{tracker_debug, tracker_info, tracker_warn};

use crate::types::map_reqwest_error;
use crate::{FailureKind, TransportError};

/// Persona count requested when a run is created through the proxy.
pub const RUN_PERSONA_COUNT: u32 = 3;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Base of the upstream job API (serves `/invoke`).
    pub api_base: String,
    /// Base of the ideas API holding the stored records (serves `/ideas`).
    pub ideas_base: String,
    /// Origin of the same-origin proxy.
    pub proxy_base: String,
    pub proxy_path: String,
    pub assistant_id: String,
    pub graph_id: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".to_string(),
            ideas_base: "http://localhost:3001/api".to_string(),
            proxy_base: ideaboard_core::DEFAULT_PROXY_BASE.to_string(),
            proxy_path: ideaboard_core::DEFAULT_PROXY_PATH.to_string(),
            assistant_id: "my_agent".to_string(),
            graph_id: "my_agent".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Stateless invoke endpoint: one request, one (possibly terminal) answer.
#[async_trait::async_trait]
pub trait JobInvoker: Send + Sync {
    /// Returns the raw response body; interpreting it is the tracker's job.
    async fn invoke(&self, request: &InvokeRequest) -> Result<String, TransportError>;
}

/// Creates a persona-generation run for a thread.
#[async_trait::async_trait]
pub trait RunCreator: Send + Sync {
    async fn create_run(
        &self,
        thread_id: &str,
        submission: &IdeaSubmission,
        credential: Option<&str>,
    ) -> Result<String, TransportError>;
}

/// Read access to the stored idea records, the authoritative copy of a result.
#[async_trait::async_trait]
pub trait IdeaReader: Send + Sync {
    async fn get_idea(&self, id: &str, credential: Option<&str>)
        -> Result<JobRecord, TransportError>;

    /// `page` counts from 1.
    async fn list_ideas(
        &self,
        page: u32,
        limit: u32,
        credential: Option<&str>,
    ) -> Result<IdeaPage, TransportError>;
}

/// Fresh client-side thread id.
pub fn new_thread_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone)]
pub struct HttpJobClient {
    settings: ClientSettings,
}

impl HttpJobClient {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn build_client(&self) -> Result<reqwest::Client, TransportError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| TransportError::new(FailureKind::Network, err.to_string()))
    }

    fn ideas_url(&self, segments: &[&str]) -> Result<reqwest::Url, TransportError> {
        let invalid = |reason: String| TransportError::new(FailureKind::InvalidUrl, reason);
        let mut url = reqwest::Url::parse(&self.settings.ideas_base)
            .map_err(|err| invalid(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid(format!("{} cannot be a base", self.settings.ideas_base)))?
            .pop_if_empty()
            .push("ideas")
            .extend(segments);
        Ok(url)
    }

    async fn get_text(
        &self,
        url: reqwest::Url,
        credential: Option<&str>,
    ) -> Result<String, TransportError> {
        let client = self.build_client()?;
        let mut request = client.get(url).header(ACCEPT, "application/json");
        if let Some(token) = credential {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(TransportError::new(
                FailureKind::HttpStatus(status.as_u16()),
                if text.is_empty() { status.to_string() } else { text },
            ));
        }
        Ok(text)
    }

    fn run_payload(&self, thread_id: &str, submission: &IdeaSubmission) -> serde_json::Value {
        json!({
            "assistant_id": self.settings.assistant_id,
            "input": {
                "title": submission.title,
                "description": submission.description,
                "targetAudience": submission.target_audience,
                "mvpLink": submission.mvp_link.clone().unwrap_or_default(),
                "number": RUN_PERSONA_COUNT,
                "collection_name": "Personas",
                "personas_db_name": "persona",
                "persona": [],
                "current_persona": null,
                "generated_count": 0,
                "status": "pending",
            },
            "config": {
                "configurable": {
                    "thread_id": thread_id,
                    "assistant_id": self.settings.assistant_id,
                    "graph_id": self.settings.graph_id,
                }
            },
            "stream_mode": ["values"],
            // The response is dropped once accepted; the run must outlive it.
            "on_disconnect": "continue",
        })
    }
}

impl Default for HttpJobClient {
    fn default() -> Self {
        Self::new(ClientSettings::default())
    }
}

#[async_trait::async_trait]
impl JobInvoker for HttpJobClient {
    async fn invoke(&self, request: &InvokeRequest) -> Result<String, TransportError> {
        let url = format!("{}/invoke", self.settings.api_base.trim_end_matches('/'));
        let body = serde_json::to_vec(request)
            .map_err(|err| TransportError::new(FailureKind::Encode, err.to_string()))?;
        let client = self.build_client()?;

        let response = client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            tracker_warn!("Invoke for {} failed with {}: {}", request.thread_id, status, text);
            return Err(TransportError::new(
                FailureKind::HttpStatus(status.as_u16()),
                text,
            ));
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl RunCreator for HttpJobClient {
    async fn create_run(
        &self,
        thread_id: &str,
        submission: &IdeaSubmission,
        credential: Option<&str>,
    ) -> Result<String, TransportError> {
        let url = proxy_url(
            &self.settings.proxy_base,
            &self.settings.proxy_path,
            &stream_path(thread_id),
            None,
        )
        .map_err(|err| TransportError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let body = serde_json::to_vec(&self.run_payload(thread_id, submission))
            .map_err(|err| TransportError::new(FailureKind::Encode, err.to_string()))?;
        let client = self.build_client()?;

        let mut request = client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .body(body);
        if let Some(token) = credential {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        // Only the status matters here; progress is read by the tracker, which
        // joins the run through its own subscription.
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::new(
                FailureKind::HttpStatus(status.as_u16()),
                if text.is_empty() { status.to_string() } else { text },
            ));
        }
        tracker_info!("Created run for thread {}", thread_id);
        Ok(thread_id.to_string())
    }
}

#[async_trait::async_trait]
impl IdeaReader for HttpJobClient {
    async fn get_idea(
        &self,
        id: &str,
        credential: Option<&str>,
    ) -> Result<JobRecord, TransportError> {
        let url = self.ideas_url(&[id])?;
        let text = self.get_text(url, credential).await?;
        JobRecord::from_upstream(&text)
            .map_err(|err| TransportError::new(FailureKind::Decode, err.to_string()))
    }

    async fn list_ideas(
        &self,
        page: u32,
        limit: u32,
        credential: Option<&str>,
    ) -> Result<IdeaPage, TransportError> {
        let mut url = self.ideas_url(&[])?;
        url.query_pairs_mut()
            .append_pair("page", &page.max(1).to_string())
            .append_pair("limit", &limit.to_string());
        let text = self.get_text(url, credential).await?;
        tracker_debug!("Listed ideas page {} ({} bytes)", page, text.len());
        IdeaPage::from_upstream(&text)
            .map_err(|err| TransportError::new(FailureKind::Decode, err.to_string()))
    }
}
