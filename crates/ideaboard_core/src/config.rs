use std::time::Duration;

use url::Url;

use crate::IdeaSubmission;

pub const DEFAULT_PROXY_BASE: &str = "http://localhost:3000";
pub const DEFAULT_PROXY_PATH: &str = "/api/proxy";
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(1500);

/// How a tracker learns about its job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Subscribe to `/threads/{id}/runs/stream` through the proxy.
    Stream,
    /// Re-invoke the stateless endpoint with the original submission.
    Poll {
        submission: IdeaSubmission,
        retry: RetryPolicy,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// One invoke; a non-terminal answer fails the job.
    Disabled,
    /// Re-invoke every `interval` until `max_attempts` responses were seen.
    Enabled { max_attempts: u32, interval: Duration },
}

impl RetryPolicy {
    pub fn max_attempts(self) -> u32 {
        match self {
            RetryPolicy::Disabled => 1,
            RetryPolicy::Enabled { max_attempts, .. } => max_attempts.max(1),
        }
    }
}

/// What to do when no credential is available at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialPolicy {
    /// Do nothing; the status stays `pending`.
    StayPending,
    /// Move straight to `failed`.
    #[default]
    FailFast,
}

/// Route family to navigate to on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectTarget {
    /// `/ideas/{id}`
    Detail,
    /// `/ideas/{id}/analytics`
    #[default]
    Analytics,
}

impl RedirectTarget {
    pub fn route(self, job_id: &str) -> String {
        match self {
            RedirectTarget::Detail => format!("/ideas/{job_id}"),
            RedirectTarget::Analytics => format!("/ideas/{job_id}/analytics"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSteps {
    pub watermark: u8,
    pub step: u8,
    pub cap: u8,
    pub finalizing: u8,
}

impl Default for ProgressSteps {
    fn default() -> Self {
        Self {
            watermark: 10,
            step: 10,
            cap: 80,
            finalizing: 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub transport: Transport,
    pub credential_policy: CredentialPolicy,
    pub redirect: RedirectTarget,
    pub redirect_delay: Duration,
    pub proxy_base: String,
    pub proxy_path: String,
    pub progress: ProgressSteps,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Stream,
            credential_policy: CredentialPolicy::default(),
            redirect: RedirectTarget::default(),
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            proxy_base: DEFAULT_PROXY_BASE.to_string(),
            proxy_path: DEFAULT_PROXY_PATH.to_string(),
            progress: ProgressSteps::default(),
        }
    }
}

impl TrackerConfig {
    /// Proxy URL relaying `upstream_path` for this tracker.
    pub fn proxy_url(&self, upstream_path: &str, token: Option<&str>) -> Result<Url, url::ParseError> {
        proxy_url(&self.proxy_base, &self.proxy_path, upstream_path, token)
    }

    pub fn stream_url(&self, job_id: &str, token: &str) -> Result<Url, url::ParseError> {
        self.proxy_url(&stream_path(job_id), Some(token))
    }
}

/// Same-origin proxy URL relaying `upstream_path`. The bearer credential travels
/// as a query parameter because event-stream clients cannot set headers.
pub fn proxy_url(
    base: &str,
    proxy_path: &str,
    upstream_path: &str,
    token: Option<&str>,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?.join(proxy_path)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("path", upstream_path);
        if let Some(token) = token {
            query.append_pair("authorization", &format!("Bearer {token}"));
        }
    }
    Ok(url)
}

pub fn stream_path(job_id: &str) -> String {
    format!("/threads/{job_id}/runs/stream")
}
