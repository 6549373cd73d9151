use std::fmt::Write;
use std::sync::Arc;

use ideaboard_core::{result_key, IdeaPage, JobRecord, JobStatus, TrackerView};
use ideaboard_engine::{LocalStore, Navigator, StatusSink};
use tracker_logging::{tracker_info, tracker_warn};

/// Prints one progress line per status change.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalStatusSink;

impl StatusSink for TerminalStatusSink {
    fn status_changed(&self, job_id: &str, status: &JobStatus) {
        let view = TrackerView::from_status(job_id, status);
        println!("{}", view.render_line());
        if view.show_retry {
            println!("Run `ideaboard track {job_id}` to try again.");
        }
    }
}

/// On success, shows the route and the cached record for the job.
pub struct TerminalNavigator {
    job_id: String,
    store: Arc<dyn LocalStore>,
}

impl TerminalNavigator {
    pub fn new(job_id: impl Into<String>, store: Arc<dyn LocalStore>) -> Self {
        Self {
            job_id: job_id.into(),
            store,
        }
    }
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: &str) {
        tracker_info!("Navigate to {}", route);
        println!("Results ready: {route}");
        match load_record(self.store.as_ref(), &self.job_id) {
            Some(record) => print!("{}", render_record(&record)),
            None => tracker_warn!("No cached result for {}", self.job_id),
        }
    }
}

/// Cached record for `job_id`, if one was stored and parses.
pub fn load_record(store: &dyn LocalStore, job_id: &str) -> Option<JobRecord> {
    let raw = match store.get(&result_key(job_id)) {
        Ok(raw) => raw?,
        Err(err) => {
            tracker_warn!("Could not read cached result for {}: {}", job_id, err);
            return None;
        }
    };
    match JobRecord::from_cached_payload(job_id, &raw) {
        Ok(record) => Some(record),
        Err(err) => {
            tracker_warn!("Cached result for {} is not JSON: {}", job_id, err);
            None
        }
    }
}

pub fn render_record(record: &JobRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", record.title, record.status.label());
    if !record.target_audience.is_empty() {
        let _ = writeln!(out, "Audience: {}", record.target_audience);
    }
    if let Some(link) = &record.mvp_link {
        let _ = writeln!(out, "MVP: {link}");
    }
    if !record.description.is_empty() {
        let _ = writeln!(out, "{}", record.description);
    }
    if record.feedback.is_empty() {
        let _ = writeln!(out, "No persona feedback yet.");
    }
    for (idx, persona) in record.feedback.iter().enumerate() {
        let _ = writeln!(out);
        let _ = write!(out, "{}. {} [{}]", idx + 1, persona.persona_id, persona.persona_type);
        match persona.rating {
            Some(rating) => {
                let _ = writeln!(out, " rating {rating}");
            }
            None => {
                let _ = writeln!(out);
            }
        }
        for line in persona.persona_profile.lines() {
            let _ = writeln!(out, "   {line}");
        }
        if !persona.feedback.is_empty() {
            let _ = writeln!(out, "   > {}", persona.feedback);
        }
    }
    out
}

/// One line per idea; the job this machine is tracking gets a `*`.
pub fn render_idea_list(page: &IdeaPage, active: Option<&str>) -> String {
    let mut out = String::new();
    if page.ideas.is_empty() {
        let _ = writeln!(out, "No ideas yet.");
    }
    for idea in &page.ideas {
        let marker = if active == Some(idea.job_id.as_str()) { '*' } else { ' ' };
        let _ = writeln!(
            out,
            "{marker} {:<12} {:<36} {}",
            idea.status.label(),
            idea.job_id,
            idea.title
        );
    }
    let _ = writeln!(out, "{} of {} ideas", page.ideas.len(), page.total);
    out
}
