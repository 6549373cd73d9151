//! Ideaboard core: pure job-status state machine, payload mapping and view models.
mod classify;
mod config;
mod effect;
mod msg;
mod record;
mod state;
mod status;
mod update;
mod view_model;

pub use classify::{classify_poll_response, classify_stream_message, personas, Inbound};
pub use config::{
    proxy_url, stream_path, CredentialPolicy, ProgressSteps, RedirectTarget, RetryPolicy, TrackerConfig,
    Transport, DEFAULT_PROXY_BASE, DEFAULT_PROXY_PATH, DEFAULT_REDIRECT_DELAY,
};
pub use effect::Effect;
pub use msg::Msg;
pub use record::{
    result_key, IdeaPage, IdeaSubmission, InvokeRequest, JobRecord, PersonaFeedback, RecordStatus,
    DEFAULT_INVOKE_PERSONAS, RESULT_KEY_PREFIX,
};
pub use state::{Link, TrackerState};
pub use status::{
    JobStatus, Phase, MSG_COMPLETED, MSG_CONNECTION_LOST, MSG_FINALIZING, MSG_GENERATING,
    MSG_INCOMPLETE, MSG_MALFORMED, MSG_NOT_SIGNED_IN, MSG_STARTING, MSG_TIMED_OUT,
};
pub use update::update;
pub use view_model::{TrackerView, BAR_WIDTH};
