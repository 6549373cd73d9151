use crate::{JobStatus, Phase};

/// Width of the textual progress bar.
pub const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerView {
    pub job_id: String,
    pub message: String,
    pub progress: u8,
    pub phase: Phase,
    pub show_progress: bool,
    /// Failed jobs offer a coarse "try again" that restarts tracking from scratch.
    pub show_retry: bool,
}

impl TrackerView {
    pub fn from_status(job_id: &str, status: &JobStatus) -> Self {
        let phase = status.phase();
        Self {
            job_id: job_id.to_string(),
            message: status.message().to_string(),
            progress: status.progress(),
            phase,
            show_progress: phase != Phase::Failed,
            show_retry: phase == Phase::Failed,
        }
    }

    /// One-line rendering, e.g. `[#########.....] 30% Generating personas...`.
    pub fn render_line(&self) -> String {
        if !self.show_progress {
            return format!("[failed] {}", self.message);
        }
        let filled = usize::from(self.progress) * BAR_WIDTH / 100;
        format!(
            "[{}{}] {:>3}% {}",
            "#".repeat(filled),
            ".".repeat(BAR_WIDTH - filled),
            self.progress,
            self.message
        )
    }
}
