use crate::view_model::TrackerView;
use crate::{InvokeRequest, JobStatus, Phase, TrackerConfig, Transport};

/// What the tracker currently has in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Link {
    /// Nothing opened yet.
    #[default]
    Idle,
    /// Event-stream subscription is open.
    Streaming,
    /// One invoke call is outstanding.
    Invoking,
    /// Waiting for the next poll interval.
    Waiting,
    /// Closed for good.
    Closed,
}

impl Link {
    pub fn is_active(self) -> bool {
        matches!(self, Link::Streaming | Link::Invoking | Link::Waiting)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Redirect {
    #[default]
    None,
    Scheduled,
    Done,
}

/// Live state of one tracked job.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerState {
    job_id: String,
    config: TrackerConfig,
    status: JobStatus,
    link: Link,
    started: bool,
    torn_down: bool,
    attempts: u32,
    redirect: Redirect,
}

impl TrackerState {
    pub fn new(job_id: impl Into<String>, config: TrackerConfig) -> Self {
        Self {
            job_id: job_id.into(),
            config,
            status: JobStatus::pending(),
            link: Link::Idle,
            started: false,
            torn_down: false,
            attempts: 0,
            redirect: Redirect::None,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn phase(&self) -> Phase {
        self.status.phase()
    }

    pub fn link(&self) -> Link {
        self.link
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// True once nothing more can happen: torn down, or terminal with no
    /// connection and no pending navigation.
    pub fn is_settled(&self) -> bool {
        if self.torn_down {
            return true;
        }
        match self.status.phase() {
            Phase::Completed => self.redirect == Redirect::Done,
            Phase::Failed => !self.link.is_active(),
            Phase::Pending => self.started && self.link == Link::Idle,
            Phase::Generating => false,
        }
    }

    pub fn view(&self) -> TrackerView {
        TrackerView::from_status(&self.job_id, &self.status)
    }

    pub(crate) fn status_mut(&mut self) -> &mut JobStatus {
        &mut self.status
    }

    pub(crate) fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn mark_started(&mut self) {
        self.started = true;
    }

    pub(crate) fn set_link(&mut self, link: Link) {
        self.link = link;
    }

    pub(crate) fn record_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    pub(crate) fn redirect(&self) -> Redirect {
        self.redirect
    }

    pub(crate) fn set_redirect(&mut self, redirect: Redirect) {
        self.redirect = redirect;
    }

    pub(crate) fn tear_down(&mut self) {
        self.torn_down = true;
        self.link = Link::Closed;
    }

    pub(crate) fn invoke_request(&self) -> Option<InvokeRequest> {
        match &self.config.transport {
            Transport::Poll { submission, .. } => {
                Some(InvokeRequest::new(self.job_id.clone(), submission))
            }
            Transport::Stream => None,
        }
    }
}
