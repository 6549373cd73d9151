use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use ideaboard_core::{
    CredentialPolicy, IdeaSubmission, ProgressSteps, RedirectTarget, RetryPolicy, TrackerConfig,
    Transport, DEFAULT_PROXY_BASE, DEFAULT_PROXY_PATH,
};
use ideaboard_engine::ClientSettings;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use tracker_logging::LogDestination;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub proxy: Proxy,
    pub api: Api,
    pub tracker: Tracker,
    pub store: Store,
    pub logging: Logging,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proxy {
    /// Origin of the authenticating proxy, e.g. http://localhost:3000
    pub base: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Api {
    /// Base of the stateless invoke endpoint.
    pub base: String,
    /// Base of the stored-ideas API, e.g. http://localhost:3001/api
    pub ideas_base: String,
    pub assistant_id: String,
    pub graph_id: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Stream,
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingCredential {
    Pending,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Redirect {
    Detail,
    Analytics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tracker {
    pub transport: TransportKind,
    /// Poll transport only: keep re-invoking until the job completes.
    pub retry: bool,
    pub max_attempts: u32,
    pub poll_interval_ms: u64,
    pub missing_credential: MissingCredential,
    pub redirect: Redirect,
    pub redirect_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    /// `file`, `terminal` or `both`.
    pub destination: String,
    pub level: String,
    pub file: PathBuf,
}

impl Default for Proxy {
    fn default() -> Self {
        Self {
            base: DEFAULT_PROXY_BASE.to_string(),
            path: DEFAULT_PROXY_PATH.to_string(),
        }
    }
}

impl Default for Api {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            base: client.api_base,
            ideas_base: client.ideas_base,
            assistant_id: client.assistant_id,
            graph_id: client.graph_id,
            connect_timeout_secs: client.connect_timeout.as_secs(),
            request_timeout_secs: client.request_timeout.as_secs(),
        }
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self {
            transport: TransportKind::Stream,
            retry: false,
            max_attempts: 30,
            poll_interval_ms: 2000,
            missing_credential: MissingCredential::Fail,
            redirect: Redirect::Analytics,
            redirect_delay_ms: 1500,
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/store"),
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            destination: "file".to_string(),
            level: "info".to_string(),
            file: PathBuf::from("ideaboard.log"),
        }
    }
}

impl Settings {
    /// Defaults, then the optional file at `path`, then `IDEABOARD__SECTION__KEY` variables.
    pub fn load(path: &Path) -> Result<Self> {
        let api = Api::default();
        let tracker = Tracker::default();
        let mut builder = config::Config::builder()
            .set_default("proxy.base", Proxy::default().base)?
            .set_default("proxy.path", Proxy::default().path)?
            .set_default("api.base", api.base)?
            .set_default("api.ideas_base", api.ideas_base)?
            .set_default("api.assistant_id", api.assistant_id)?
            .set_default("api.graph_id", api.graph_id)?
            .set_default("api.connect_timeout_secs", api.connect_timeout_secs)?
            .set_default("api.request_timeout_secs", api.request_timeout_secs)?
            .set_default("tracker.transport", "stream")?
            .set_default("tracker.retry", tracker.retry)?
            .set_default("tracker.max_attempts", tracker.max_attempts)?
            .set_default("tracker.poll_interval_ms", tracker.poll_interval_ms)?
            .set_default("tracker.missing_credential", "fail")?
            .set_default("tracker.redirect", "analytics")?
            .set_default("tracker.redirect_delay_ms", tracker.redirect_delay_ms)?
            .set_default(
                "store.dir",
                Store::default().dir.to_string_lossy().to_string(),
            )?
            .set_default("logging.destination", Logging::default().destination)?
            .set_default("logging.level", Logging::default().level)?
            .set_default(
                "logging.file",
                Logging::default().file.to_string_lossy().to_string(),
            )?;

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        }

        // Environment overrides: IDEABOARD__TRACKER__TRANSPORT=poll, etc.
        builder = builder.add_source(
            config::Environment::with_prefix("IDEABOARD")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder
            .build()
            .with_context(|| format!("loading settings from {}", path.display()))?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    pub fn log_destination(&self) -> Result<LogDestination> {
        LogDestination::from_name(&self.logging.destination)
            .with_context(|| format!("unknown log destination {:?}", self.logging.destination))
    }

    pub fn log_level(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.logging.level)
            .with_context(|| format!("unknown log level {:?}", self.logging.level))
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            api_base: self.api.base.clone(),
            ideas_base: self.api.ideas_base.clone(),
            proxy_base: self.proxy.base.clone(),
            proxy_path: self.proxy.path.clone(),
            assistant_id: self.api.assistant_id.clone(),
            graph_id: self.api.graph_id.clone(),
            connect_timeout: Duration::from_secs(self.api.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.api.request_timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        if self.tracker.retry {
            RetryPolicy::Enabled {
                max_attempts: self.tracker.max_attempts,
                interval: Duration::from_millis(self.tracker.poll_interval_ms),
            }
        } else {
            RetryPolicy::Disabled
        }
    }

    /// Tracker configuration for one job. Poll transport needs the original submission.
    pub fn tracker_config(&self, submission: Option<IdeaSubmission>) -> Result<TrackerConfig> {
        let transport = match (self.tracker.transport, submission) {
            (TransportKind::Stream, _) => Transport::Stream,
            (TransportKind::Poll, Some(submission)) => Transport::Poll {
                submission,
                retry: self.retry_policy(),
            },
            (TransportKind::Poll, None) => {
                anyhow::bail!("poll transport needs the submission this job was created from")
            }
        };
        Ok(TrackerConfig {
            transport,
            credential_policy: match self.tracker.missing_credential {
                MissingCredential::Pending => CredentialPolicy::StayPending,
                MissingCredential::Fail => CredentialPolicy::FailFast,
            },
            redirect: match self.tracker.redirect {
                Redirect::Detail => RedirectTarget::Detail,
                Redirect::Analytics => RedirectTarget::Analytics,
            },
            redirect_delay: Duration::from_millis(self.tracker.redirect_delay_ms),
            proxy_base: self.proxy.base.clone(),
            proxy_path: self.proxy.path.clone(),
            progress: ProgressSteps::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn submission() -> IdeaSubmission {
        IdeaSubmission {
            title: "Bike share".to_string(),
            description: "Bikes for commuters".to_string(),
            target_audience: "Commuters".to_string(),
            mvp_link: None,
            persona_count: 2,
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp_dir = TempDir::new().expect("temp dir");
        let settings =
            Settings::load(&temp_dir.path().join("nonexistent.toml")).expect("load settings");

        assert_eq!(settings.proxy.base, "http://localhost:3000");
        assert_eq!(settings.proxy.path, "/api/proxy");
        assert_eq!(settings.api.base, "http://localhost:8000");
        assert_eq!(settings.api.ideas_base, "http://localhost:3001/api");
        assert_eq!(settings.tracker.transport, TransportKind::Stream);
        assert_eq!(settings.tracker.missing_credential, MissingCredential::Fail);
        assert_eq!(settings.log_level().expect("level"), LevelFilter::Info);
        assert_eq!(
            settings.log_destination().expect("destination"),
            LogDestination::File
        );

        let config = settings.tracker_config(None).expect("stream config");
        assert_eq!(config.transport, Transport::Stream);
        assert_eq!(config.redirect, RedirectTarget::Analytics);
        assert_eq!(config.redirect_delay, Duration::from_millis(1500));
    }

    #[test]
    fn file_overrides_defaults() {
        let temp_dir = TempDir::new().expect("temp dir");
        let config_path = temp_dir.path().join("ideaboard.toml");
        fs::write(
            &config_path,
            r#"
[proxy]
base = "https://ideas.example.com"

[api]
ideas_base = "https://ideas.example.com/api"

[tracker]
transport = "poll"
retry = true
max_attempts = 4
poll_interval_ms = 250
missing_credential = "pending"
redirect = "detail"

[logging]
destination = "both"
level = "debug"
"#,
        )
        .expect("write config");

        let settings = Settings::load(&config_path).expect("load settings");
        assert_eq!(settings.proxy.base, "https://ideas.example.com");
        assert_eq!(settings.proxy.path, "/api/proxy");
        assert_eq!(
            settings.client_settings().ideas_base,
            "https://ideas.example.com/api"
        );
        assert_eq!(settings.log_level().expect("level"), LevelFilter::Debug);

        let config = settings
            .tracker_config(Some(submission()))
            .expect("poll config");
        assert_eq!(config.credential_policy, CredentialPolicy::StayPending);
        assert_eq!(config.redirect, RedirectTarget::Detail);
        assert_eq!(
            config.transport,
            Transport::Poll {
                submission: submission(),
                retry: RetryPolicy::Enabled {
                    max_attempts: 4,
                    interval: Duration::from_millis(250),
                },
            }
        );
    }

    #[test]
    fn poll_without_submission_is_rejected() {
        let mut settings = Settings::default();
        settings.tracker.transport = TransportKind::Poll;
        assert!(settings.tracker_config(None).is_err());
    }

    #[test]
    fn unknown_log_destination_is_an_error() {
        let mut settings = Settings::default();
        settings.logging.destination = "syslog".to_string();
        assert!(settings.log_destination().is_err());
    }
}
