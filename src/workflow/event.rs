use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notifications a running workflow sends to its caller.
///
/// Events arrive over a channel the caller drains on its own task; the
/// workflow never touches caller state directly.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// Simulated progress, 0.0 to 1.0. Not tied to bytes transferred.
    Progress(f64),
    /// Sent once simulated progress finishes, before the image transfer.
    FieldsExtracted { title: String, author: String },
    Completed(RunReport),
    Cancelled(String),
    Failed(String),
}

impl WorkflowEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowEvent::Completed(_) | WorkflowEvent::Cancelled(_) | WorkflowEvent::Failed(_)
        )
    }
}

/// The file a completed run wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedImage {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Structured record of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub title: String,
    pub author: String,
    pub image_url: String,
    /// `None` when the input carried no image URL.
    pub image: Option<SavedImage>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RunReport {
    pub fn new(
        run_id: Uuid,
        fields: &ExtractedFields,
        image: Option<SavedImage>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let completed_at = Utc::now();
        Self {
            run_id,
            title: fields.title.clone(),
            author: fields.author.clone(),
            image_url: fields.image_url.clone(),
            image,
            started_at,
            completed_at,
            duration_ms: (completed_at - started_at).num_milliseconds(),
        }
    }
}

/// Title and author after placeholder substitution, plus the raw image URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFields {
    pub title: String,
    pub author: String,
    pub image_url: String,
}
