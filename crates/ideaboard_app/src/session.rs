use chrono::{DateTime, Utc};
use ideaboard_core::IdeaSubmission;
use ideaboard_engine::LocalStore;
use serde::{Deserialize, Serialize};
use tracker_logging::{tracker_error, tracker_info, tracker_warn};

use crate::settings::TransportKind;

/// Store key of the RON session snapshot.
pub const SESSION_KEY: &str = "ideaboard_session";

/// The last submission made from this machine, kept so `resume` can re-track it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub active_thread: String,
    pub transport: TransportKind,
    pub submission: IdeaSubmission,
    pub started_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// The submission, if this snapshot belongs to `job_id`.
    pub fn submission_for(&self, job_id: &str) -> Option<&IdeaSubmission> {
        (self.active_thread == job_id).then_some(&self.submission)
    }
}

pub fn load_session(store: &dyn LocalStore) -> Option<SessionSnapshot> {
    let content = match store.get(SESSION_KEY) {
        Ok(Some(text)) => text,
        Ok(None) => return None,
        Err(err) => {
            tracker_warn!("Failed to read session: {}", err);
            return None;
        }
    };

    match ron::from_str(&content) {
        Ok(snapshot) => {
            tracker_info!("Loaded session");
            Some(snapshot)
        }
        Err(err) => {
            tracker_warn!("Failed to parse session: {}", err);
            None
        }
    }
}

pub fn save_session(store: &dyn LocalStore, snapshot: &SessionSnapshot) {
    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(snapshot, pretty) {
        Ok(text) => text,
        Err(err) => {
            tracker_error!("Failed to serialize session: {}", err);
            return;
        }
    };

    if let Err(err) = store.set(SESSION_KEY, &content) {
        tracker_error!("Failed to write session: {}", err);
    }
}
