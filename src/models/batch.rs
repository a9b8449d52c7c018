use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use super::canonical::CanonicalRecord;
use crate::export::hybrid::HybridRow;
use crate::types::{ExtractedValues, OverrideMetadata};

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

/// Where a batch row's workbook comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum SourceReference {
    Url(String),
    Path(PathBuf),
}

impl SourceReference {
    /// Accepts an http(s) URL or a path with a workbook extension. Anything
    /// else is not a source.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        let lower = s.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Some(SourceReference::Url(s.to_string()));
        }
        let path = PathBuf::from(s);
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())?;
        if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
            Some(SourceReference::Path(path))
        } else {
            None
        }
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceReference::Url(u) => f.write_str(u),
            SourceReference::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Cancelled,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Processing => "processing",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One input row and everything produced for it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    pub row_index: usize,
    pub source: Option<SourceReference>,
    pub metadata: OverrideMetadata,
    pub status: JobStatus,
    pub extracted: Option<ExtractedValues>,
    pub record: Option<CanonicalRecord>,
    pub output_row: Option<HybridRow>,
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
}

impl BatchJob {
    pub fn new(row_index: usize, source: Option<SourceReference>, metadata: OverrideMetadata) -> Self {
        Self {
            row_index,
            source,
            metadata,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSession {
    pub id: SessionId,
    pub jobs: Vec<BatchJob>,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
    pub status: SessionStatus,
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchSession {
    pub fn new(jobs: Vec<BatchJob>) -> Self {
        Self {
            id: SessionId::new(),
            jobs,
            completed_jobs: 0,
            failed_jobs: 0,
            status: SessionStatus::Idle,
            cancel_requested: false,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn total(&self) -> usize {
        self.jobs.len()
    }

    pub fn processed(&self) -> usize {
        self.completed_jobs + self.failed_jobs
    }

    /// Whole-number percentage of jobs that reached a terminal state.
    pub fn percent_complete(&self) -> u8 {
        percent(self.processed(), self.total())
    }
}

pub(crate) fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}

/// Notifications delivered to the caller of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BatchEvent {
    #[serde(rename_all = "camelCase")]
    Started { session_id: SessionId, total: usize },
    /// Emitted before a row is processed.
    #[serde(rename_all = "camelCase")]
    Progress {
        session_id: SessionId,
        index: usize,
        total: usize,
        status: JobStatus,
        percent_complete: u8,
    },
    #[serde(rename_all = "camelCase")]
    JobFinished {
        session_id: SessionId,
        index: usize,
        status: JobStatus,
        error: Option<String>,
        duration_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        session_id: SessionId,
        completed_jobs: usize,
        failed_jobs: usize,
    },
    #[serde(rename_all = "camelCase")]
    Cancelled {
        session_id: SessionId,
        completed_jobs: usize,
        failed_jobs: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_reference_parsing() {
        assert_eq!(
            SourceReference::parse(" https://docs.google.com/spreadsheets/d/abc "),
            Some(SourceReference::Url("https://docs.google.com/spreadsheets/d/abc".into()))
        );
        assert_eq!(
            SourceReference::parse("intake/Acme.XLSX"),
            Some(SourceReference::Path(PathBuf::from("intake/Acme.XLSX")))
        );
        assert_eq!(SourceReference::parse("notes.txt"), None);
        assert_eq!(SourceReference::parse("Acme Corp"), None);
        assert_eq!(SourceReference::parse("   "), None);
    }

    #[test]
    fn percent_complete_rounds_down() {
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn session_id_round_trips_through_display() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn progress_event_serializes_with_type_tag() {
        let id = SessionId::new();
        let json = serde_json::to_value(BatchEvent::Progress {
            session_id: id,
            index: 2,
            total: 10,
            status: JobStatus::Processing,
            percent_complete: 20,
        })
        .unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["percentComplete"], 20);
        assert_eq!(json["status"], "processing");
    }
}
