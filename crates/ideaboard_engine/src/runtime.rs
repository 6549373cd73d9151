use std::sync::Arc;
use std::time::Duration;

use ideaboard_core::{update, Effect, JobStatus, Msg, TrackerConfig, TrackerState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracker_logging::{tracker_debug, tracker_error, tracker_info, tracker_trace, tracker_warn};

use crate::client::JobInvoker;
use crate::credentials::CredentialProvider;
use crate::navigate::Navigator;
use crate::store::{LocalStore, ACTIVE_THREAD_KEY};
use crate::subscribe::{ChannelEventSink, StreamSubscriber};

/// Observer for status changes of a running tracker.
pub trait StatusSink: Send + Sync {
    fn status_changed(&self, job_id: &str, status: &JobStatus);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn status_changed(&self, job_id: &str, status: &JobStatus) {
        tracker_info!("{} {}", job_id, status);
    }
}

/// Collaborators a tracker talks to. Every one is injected, none is global.
#[derive(Clone)]
pub struct TrackerDeps {
    pub subscriber: Arc<dyn StreamSubscriber>,
    pub invoker: Arc<dyn JobInvoker>,
    pub store: Arc<dyn LocalStore>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub navigator: Arc<dyn Navigator>,
    pub status_sink: Arc<dyn StatusSink>,
}

/// Owns one job's live status and drives it to a settled state.
pub struct Tracker {
    state: TrackerState,
    deps: TrackerDeps,
}

impl Tracker {
    pub fn new(job_id: impl Into<String>, config: TrackerConfig, deps: TrackerDeps) -> Self {
        Self {
            state: TrackerState::new(job_id, config),
            deps,
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<JobStatus> {
        tokio::spawn(self.run(cancel))
    }

    /// Runs until the job is settled or `cancel` fires, and returns the final status.
    ///
    /// All messages pass through one queue and are applied in arrival order;
    /// each message's effects run to completion before the next is taken.
    pub async fn run(self, cancel: CancellationToken) -> JobStatus {
        let Tracker { state, deps } = self;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut runner = Runner {
            job_id: state.job_id().to_string(),
            deps,
            tx,
            tasks: CancellationToken::new(),
            connection: None,
        };

        let credential = runner.deps.credentials.credential();
        let mut state = runner.dispatch(state, Msg::Start { credential });
        while !state.is_settled() {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => Some(Msg::Teardown),
                msg = rx.recv() => msg,
            };
            let Some(msg) = next else { break };
            state = runner.dispatch(state, msg);
        }

        runner.tasks.cancel();
        tracker_debug!("Tracker for {} settled: {}", runner.job_id, state.status());
        state.status().clone()
    }
}

struct Runner {
    job_id: String,
    deps: TrackerDeps,
    tx: mpsc::UnboundedSender<Msg>,
    /// Parent of every task this tracker spawns.
    tasks: CancellationToken,
    /// The subscription, invoke call or poll timer currently outstanding.
    connection: Option<CancellationToken>,
}

impl Runner {
    fn dispatch(&mut self, state: TrackerState, msg: Msg) -> TrackerState {
        tracker_trace!("{} <- {:?}", self.job_id, msg);
        let (state, effects) = update(state, msg);
        for effect in effects {
            self.execute(effect);
        }
        state
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::OpenStream { url } => {
                let token = self.replace_connection();
                let subscriber = self.deps.subscriber.clone();
                let tx = self.tx.clone();
                tracker_info!("Subscribing to status stream for {}", self.job_id);
                tokio::spawn(async move {
                    let sink = ChannelEventSink::new(tx.clone(), Msg::StreamMessage);
                    tokio::select! {
                        _ = token.cancelled() => {}
                        err = subscriber.subscribe(&url, &sink) => {
                            let _ = tx.send(Msg::TransportError(err.to_string()));
                        }
                    }
                });
            }
            Effect::Invoke { request } => {
                let token = self.replace_connection();
                let invoker = self.deps.invoker.clone();
                let tx = self.tx.clone();
                tracker_info!("Invoking job {}", self.job_id);
                tokio::spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {}
                        result = invoker.invoke(&request) => {
                            let msg = match result {
                                Ok(body) => Msg::PollResponse(body),
                                Err(err) => Msg::TransportError(err.to_string()),
                            };
                            let _ = tx.send(msg);
                        }
                    }
                });
            }
            Effect::SchedulePoll { delay } => {
                let token = self.replace_connection();
                self.spawn_timer(token, delay, Msg::PollDue);
            }
            Effect::CloseConnection => {
                if let Some(token) = self.connection.take() {
                    token.cancel();
                }
            }
            Effect::PersistResult { key, payload } => {
                if let Err(err) = self.deps.store.set(&key, &payload) {
                    tracker_error!("Failed to cache result under {}: {}", key, err);
                }
            }
            Effect::ClearActiveJob => self.clear_active_job(),
            Effect::ScheduleRedirect { delay } => {
                let token = self.tasks.child_token();
                self.spawn_timer(token, delay, Msg::RedirectDue);
            }
            Effect::Navigate { route } => self.deps.navigator.navigate(&route),
            Effect::StatusChanged(status) => {
                self.deps.status_sink.status_changed(&self.job_id, &status);
            }
        }
    }

    fn replace_connection(&mut self) -> CancellationToken {
        if let Some(previous) = self.connection.take() {
            previous.cancel();
        }
        let token = self.tasks.child_token();
        self.connection = Some(token.clone());
        token
    }

    fn spawn_timer(&self, token: CancellationToken, delay: Duration, msg: Msg) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(msg);
                }
            }
        });
    }

    fn clear_active_job(&self) {
        let store = &self.deps.store;
        match store.get(ACTIVE_THREAD_KEY) {
            Ok(Some(active)) if active.trim() == self.job_id => {
                if let Err(err) = store.remove(ACTIVE_THREAD_KEY) {
                    tracker_warn!("Failed to clear active job {}: {}", self.job_id, err);
                }
            }
            Ok(_) => {}
            Err(err) => tracker_warn!("Failed to read active job: {}", err),
        }
    }
}
