use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const RESULT_KEY_PREFIX: &str = "idea_result_";
pub const DEFAULT_INVOKE_PERSONAS: u32 = 2;

/// Storage key of the cached terminal payload for `job_id`.
pub fn result_key(job_id: &str) -> String {
    format!("{RESULT_KEY_PREFIX}{job_id}")
}

/// Idea fields collected from the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaSubmission {
    pub title: String,
    pub description: String,
    pub target_audience: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mvp_link: Option<String>,
    #[serde(default = "default_persona_count")]
    pub persona_count: u32,
}

fn default_persona_count() -> u32 {
    DEFAULT_INVOKE_PERSONAS
}

/// Body of the stateless invoke call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvokeRequest {
    pub thread_id: String,
    pub title: String,
    pub description: String,
    pub target_audience: String,
    pub number: u32,
    pub collection_name: String,
    #[serde(rename = "DB_name")]
    pub db_name: String,
}

impl InvokeRequest {
    pub fn new(thread_id: impl Into<String>, submission: &IdeaSubmission) -> Self {
        Self {
            thread_id: thread_id.into(),
            title: submission.title.clone(),
            description: submission.description.clone(),
            target_audience: submission.target_audience.clone(),
            number: if submission.persona_count == 0 {
                DEFAULT_INVOKE_PERSONAS
            } else {
                submission.persona_count
            },
            collection_name: "Chatgpt".to_string(),
            db_name: "persona".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonaFeedback {
    pub persona_id: String,
    pub persona_type: String,
    pub persona_profile: String,
    pub feedback: String,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RecordStatus {
    /// Label shown to users; an idea still being processed reads as generating.
    pub fn label(self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Processing => "generating",
            RecordStatus::Completed => "completed",
            RecordStatus::Failed => "failed",
        }
    }

    fn from_echo(status: Option<&str>) -> Self {
        match status {
            Some("completed") => RecordStatus::Completed,
            Some("failed") => RecordStatus::Failed,
            Some("pending") => RecordStatus::Pending,
            _ => RecordStatus::Processing,
        }
    }
}

/// One submitted idea and the feedback generated for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub job_id: String,
    pub title: String,
    pub description: String,
    pub target_audience: String,
    pub mvp_link: Option<String>,
    pub status: RecordStatus,
    pub feedback: Vec<PersonaFeedback>,
}

impl JobRecord {
    /// Builds a record from a cached terminal payload.
    ///
    /// Unknown shapes degrade to defaults rather than failing; only text that
    /// is not JSON at all is an error.
    pub fn from_cached_payload(job_id: &str, raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        let empty = Map::new();
        let object = value.as_object().unwrap_or(&empty);

        let personas = ["personas", "persona"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or_default();
        let feedback = personas
            .iter()
            .enumerate()
            .map(|(idx, persona)| persona_feedback(job_id, idx, persona))
            .collect();

        Ok(Self {
            job_id: text(object, &["thread_id"]).unwrap_or_else(|| job_id.to_string()),
            title: text(object, &["title", "name"]).unwrap_or_else(|| "Untitled".to_string()),
            description: text(object, &["description"]).unwrap_or_default(),
            target_audience: text(object, &["target_audience", "targetAudience"])
                .unwrap_or_default(),
            mvp_link: text(object, &["mvp_link", "mvpLink"]),
            status: RecordStatus::from_echo(object.get("status").and_then(Value::as_str)),
            feedback,
        })
    }
}

fn persona_feedback(job_id: &str, idx: usize, persona: &Value) -> PersonaFeedback {
    let empty = Map::new();
    let fields = persona.as_object().unwrap_or(&empty);

    let name = text(fields, &["name"]);
    let mut profile = name.clone().unwrap_or_default();
    if let Some(age) = text(fields, &["age"]) {
        profile.push_str(&format!(", {age}"));
    }
    if let Some(occupation) = text(fields, &["occupation"]) {
        profile.push_str(&format!(" — {occupation}"));
    }
    if let Some(bio) = text(fields, &["bio"]) {
        profile.push('\n');
        profile.push_str(&bio);
    }

    PersonaFeedback {
        persona_id: text(fields, &["id"])
            .or(name)
            .unwrap_or_else(|| format!("{job_id}-p-{idx}")),
        persona_type: text(fields, &["type"]).unwrap_or_else(|| "Persona".to_string()),
        persona_profile: profile,
        feedback: text(fields, &["feedback"]).unwrap_or_default(),
        rating: fields.get("rating").and_then(Value::as_f64),
    }
}

impl JobRecord {
    /// Builds a record from the server's stored idea (`GET /ideas/{id}`).
    pub fn from_upstream(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<UpstreamIdea>(raw).map(Self::from)
    }
}

/// One page of the idea listing (`GET /ideas?page=&limit=`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdeaPage {
    pub ideas: Vec<JobRecord>,
    pub total: u64,
}

impl IdeaPage {
    pub fn from_upstream(raw: &str) -> Result<Self, serde_json::Error> {
        let page: UpstreamPage = serde_json::from_str(raw)?;
        Ok(Self {
            ideas: page.ideas.into_iter().map(JobRecord::from).collect(),
            total: page.total,
        })
    }
}

#[derive(Deserialize)]
struct UpstreamPage {
    #[serde(default)]
    ideas: Vec<UpstreamIdea>,
    #[serde(default)]
    total: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamIdea {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    target_audience: String,
    #[serde(default)]
    mvp_link: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    ai_feedback: Vec<UpstreamFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamFeedback {
    #[serde(default)]
    persona_id: String,
    #[serde(default)]
    persona_type: String,
    #[serde(default)]
    persona_profile: String,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    rating: Option<f64>,
}

impl From<UpstreamIdea> for JobRecord {
    fn from(idea: UpstreamIdea) -> Self {
        Self {
            status: RecordStatus::from_echo(idea.status.as_deref()),
            feedback: idea
                .ai_feedback
                .into_iter()
                .map(|item| PersonaFeedback {
                    persona_id: item.persona_id,
                    persona_type: item.persona_type,
                    persona_profile: item.persona_profile,
                    feedback: item.feedback,
                    rating: item.rating,
                })
                .collect(),
            job_id: idea.id,
            title: idea.title,
            description: idea.description,
            target_audience: idea.target_audience,
            mvp_link: idea.mvp_link.filter(|link| !link.is_empty()),
        }
    }
}

// First non-empty string or number under any of `keys`.
fn text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
