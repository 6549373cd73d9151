use std::fmt;

use serde::{Deserialize, Serialize};

pub const MSG_STARTING: &str = "Starting persona generation...";
pub const MSG_GENERATING: &str = "Generating personas...";
pub const MSG_FINALIZING: &str = "Finalizing personas...";
pub const MSG_COMPLETED: &str = "Personas generated successfully!";
pub const MSG_CONNECTION_LOST: &str = "Lost connection to server";
pub const MSG_MALFORMED: &str = "Error processing server response";
pub const MSG_NOT_SIGNED_IN: &str = "Not signed in";
pub const MSG_TIMED_OUT: &str = "Persona generation timed out";
pub const MSG_INCOMPLETE: &str = "Persona generation did not complete";

/// Coarse lifecycle of one tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Pending,
    Generating,
    Completed,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pending => "pending",
            Phase::Generating => "generating",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status model of one job.
///
/// Fields are only reachable through the transition methods, which keep
/// `Completed => progress == 100` and `Failed => progress == 0` true and
/// refuse to move a terminal status anywhere else. Each transition returns
/// whether it was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    message: String,
    progress: u8,
    phase: Phase,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::pending()
    }
}

impl JobStatus {
    pub fn pending() -> Self {
        Self {
            message: MSG_STARTING.to_string(),
            progress: 0,
            phase: Phase::Pending,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Run metadata arrived: enter `Generating` with at least `watermark` progress.
    pub fn begin_generating(&mut self, watermark: u8) -> bool {
        self.advance(MSG_STARTING, watermark)
    }

    /// Generic progress tick, clamped below `cap`.
    pub fn tick(&mut self, step: u8, cap: u8) -> bool {
        let target = self.progress.saturating_add(step).min(cap);
        self.advance(MSG_GENERATING, target)
    }

    /// Upstream reported completion but personas have not arrived yet.
    pub fn finalizing(&mut self, level: u8) -> bool {
        self.advance(MSG_FINALIZING, level)
    }

    pub fn complete(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.phase = Phase::Completed;
        self.progress = 100;
        self.message = MSG_COMPLETED.to_string();
        true
    }

    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.phase = Phase::Failed;
        self.progress = 0;
        self.message = message.into();
        true
    }

    // Non-terminal progress never moves backwards and never reaches 100.
    fn advance(&mut self, message: &str, target: u8) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.phase = Phase::Generating;
        self.progress = self.progress.max(target.min(99));
        self.message = message.to_string();
        true
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:>3}% {}", self.phase, self.progress, self.message)
    }
}
